use httpserver::{
    async_trait, Handler, HttpRequest, HttpResponse, HttpResponseWriter, HttpServer, ServerOptions, StatusCode,
};
use std::str::from_utf8;

struct MyHandler;

#[async_trait]
impl Handler<()> for MyHandler {
    async fn handle(&self, _: &mut (), req: HttpRequest, writer: HttpResponseWriter) {
        let user_agent = if let Some(value) = req.header("user-agent") {
            format!(r#", "user_agent": {:?}"#, value)
        } else {
            String::new()
        };

        let content_type = if let Some(value) = req.header("content-type") {
            format!(r#", "content_type": {:?}"#, value)
        } else {
            String::new()
        };

        let result = format!(
            r#"{{"method": "{:?}", "path": {:?}{user_agent}{content_type}, "body": {:?}}}"#,
            req.method(),
            req.segments().join("/"),
            from_utf8(req.body()).unwrap_or(""),
        );

        writer.send(HttpResponse::new(
            StatusCode::Ok,
            result.into_bytes(),
            "application/json",
        ));
    }
}

#[tokio::main]
async fn main() {
    let mut server = HttpServer::<()>::new(ServerOptions {
        port: 8080,
        ..Default::default()
    })
    .unwrap();
    server
        .register_handler("/inspect", MyHandler)
        .unwrap();
    server.run().await.unwrap();
}
