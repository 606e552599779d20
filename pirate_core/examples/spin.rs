use pirate_core::{
    play_spin, EngineConfig, InMemoryLedger, ProvablyFairRng, SpinEngine, Wager,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example end-to-end spin against an in-memory ledger
    let server_seed = "example-server-seed";
    let client_seed = "example-client-seed";
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, 1);
    let engine = SpinEngine::new(EngineConfig::default())?;
    let ledger = InMemoryLedger::new(100);

    let result = play_spin(&engine, &ledger, "example", Wager::new(10)?, &mut rng).await?;
    let symbols = &engine.config().symbols;
    for row in &result.grid {
        let line: Vec<&str> = row.iter().map(|s| symbols.glyph(*s)).collect();
        println!("{}", line.join(" "));
    }
    println!(
        "server_seed_hash={} base_win={} chips={:?} scatters={} win={} balance={}",
        rng.server_seed_hash_hex(),
        result.base_win,
        result.multipliers,
        result.scatter_count,
        result.total_win,
        result.balance_after
    );
    Ok(())
}
