#[macroquad::main("Quarterview")]
async fn main() {
    quarterview_web_lib::run().await;
}
