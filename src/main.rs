fn main() -> anyhow::Result<()> {
    heron_tasks::run()
}
