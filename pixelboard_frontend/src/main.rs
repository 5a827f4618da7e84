fn main() -> Result<(), eframe::Error> {
    pixelboard_frontend::run_frontend()
}
