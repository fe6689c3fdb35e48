fn main() -> anyhow::Result<()> {
    modrouter::cli::run_cli()
}
