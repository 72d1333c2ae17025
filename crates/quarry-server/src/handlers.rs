pub mod connector;
pub mod directory;

pub async fn health() -> &'static str {
    "OK"
}
