fn main() -> anyhow::Result<()> {
    orrery::flow::run()
}
