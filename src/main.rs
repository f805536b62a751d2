use runrs::HandlerRegistry;

#[path = "../webapps/taosmi.es/controllers/randomSaying.rs"]
mod random_saying;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = HandlerRegistry::new().with("controllers::randomSaying", || {
        random_saying::RandomSaying
    });

    runrs::run_server(registry).await
}
