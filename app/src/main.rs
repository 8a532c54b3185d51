fn main() -> anyhow::Result<()> {
    meadow_lib::run()
}
