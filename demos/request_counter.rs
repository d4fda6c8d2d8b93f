use httpserver::{
    async_trait, ConnectionData, Handler, HttpRequest, HttpResponse, HttpResponseWriter,
    HttpServer, ServerOptions, StatusCode,
};

struct MyHandler;

struct Counter(usize);

impl ConnectionData for Counter {
    fn new() -> Self {
        Counter(0)
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

#[async_trait]
impl Handler<Counter> for MyHandler {
    async fn handle(&self, counter: &mut Counter, _: HttpRequest, writer: HttpResponseWriter) {
        counter.0 += 1;

        writer.send(HttpResponse::new(
            StatusCode::Ok,
            format!(r#"{{"count_request": {}}}"#, counter.0).into_bytes(),
            "application/json",
        ));
    }
}

#[tokio::main]
async fn main() {
    let mut server = HttpServer::<Counter>::new(ServerOptions {
        port: 8080,
        ..Default::default()
    })
    .unwrap();
    server.register_handler("/count", MyHandler).unwrap();
    server.run().await.unwrap();
}
