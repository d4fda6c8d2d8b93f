use httpserver::{
    async_trait, Handler, HttpRequest, HttpResponse, HttpResponseWriter, HttpServer, ServerOptions, StatusCode,
};

struct MyHandler;

#[async_trait]
impl Handler<()> for MyHandler {
    async fn handle(&self, _: &mut (), req: HttpRequest, writer: HttpResponseWriter) {
        let segments: Vec<&str> = req.segments().iter().map(String::as_str).collect();

        let (status, text) = match segments.as_slice() {
            ["api", "en"] => (StatusCode::Ok, r#"{"lang": "en", "text": "Hello, world!"}"#),
            ["api", "zh"] => (StatusCode::Ok, r#"{"lang": "zh", "text": "你好世界！"}"#),
            ["api", "es"] => (StatusCode::Ok, r#"{"lang": "es", "text": "¡Hola Mundo!"}"#),
            ["api", "ar"] => (StatusCode::Ok, r#"{"lang": "ar", "text": "مرحبا بالعالم!"}"#),
            ["api", "pt"] => (StatusCode::Ok, r#"{"lang": "pt", "text": "Olá, mundo!"}"#),
            ["api", "hi"] => (StatusCode::Ok, r#"{"lang": "hi", "text": "हैलो वर्ल्ड!"}"#),
            ["api", "ru"] => (StatusCode::Ok, r#"{"lang": "ru", "text": "Привет, мир!"}"#),
            ["api", _] => (
                StatusCode::NotFound,
                r#"{"error": "Language not supported", "status": "Not Found"}"#,
            ),
            _ => (
                StatusCode::Ok,
                r#"{"supported_lang": ["en", "zh", "es", "ar", "pt", "hi", "ru"]}"#,
            ),
        };

        writer.send(HttpResponse::new(
            status,
            text.as_bytes().to_vec(),
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
    server.register_handler("/api", MyHandler).unwrap();
    server.run().await.unwrap();
}
