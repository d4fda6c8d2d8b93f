use httpserver::{
    async_trait, Handler, HttpRequest, HttpResponse, HttpResponseWriter, HttpServer, ServerOptions, StatusCode,
};

struct HelloWorld;

#[async_trait]
impl Handler<()> for HelloWorld {
    async fn handle(&self, _: &mut (), _: HttpRequest, writer: HttpResponseWriter) {
        writer.send(HttpResponse::new(
            StatusCode::Ok,
            b"Hello, world!".to_vec(),
            "text/plain",
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
    server.register_handler("/hello", HelloWorld).unwrap();
    server.run().await.unwrap();
}
