#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lesson_tutor::run().await
}
