use numguess_core::{Jackpot, LotteryController};
use std::io::Write;

fn print_jackpot(jackpot: &Jackpot) {
    println!("Jackpot: {} ETH", jackpot.amount);
    println!("  Contract balance: {} ETH", jackpot.balance);
    println!(
        "  Fetched: {}",
        jackpot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

pub async fn connect(controller: &LotteryController) -> anyhow::Result<()> {
    let account = controller.connect().await?;
    let state = controller.state();

    println!("{}", state.message);
    println!("  Account: {}", account);
    println!("  Contract: {}", controller.config().contract_address);
    match &state.jackpot {
        Some(jackpot) => print_jackpot(jackpot),
        None => println!("Jackpot unavailable: {}", state.message),
    }
    Ok(())
}

pub async fn jackpot(controller: &LotteryController) -> anyhow::Result<()> {
    controller.connect().await?;
    let jackpot = controller.refresh_jackpot().await?;
    print_jackpot(&jackpot);
    Ok(())
}

/// Play one round, redrawing the animated number until the contract answers.
pub async fn play(controller: &LotteryController, number: u64) -> anyhow::Result<()> {
    controller.connect().await?;
    let config = controller.config();
    println!(
        "Playing {} for {} ETH from {}",
        number,
        config.play_cost,
        controller.state().account.map(|a| a.to_string()).unwrap_or_default()
    );

    let round = controller.play(number);
    tokio::pin!(round);
    let mut ticker = tokio::time::interval(config.animation_interval);

    let result = loop {
        tokio::select! {
            result = &mut round => break result,
            _ = ticker.tick() => {
                let state = controller.state();
                if state.in_progress {
                    match state.displayed_number {
                        Some(n) => print!("\r{} Drawing: {:>2}", state.message, n),
                        None => print!("\r{}", state.message),
                    }
                    let _ = std::io::stdout().flush();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Stopped waiting. The transaction may still be mined.");
                return Ok(());
            }
        }
    };
    println!();

    let state = controller.state();
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("{}", state.message);
            return Err(e.into());
        }
    };

    println!("Your Number: {}", outcome.result.player_number);
    println!("Contract Number: {}", outcome.result.contract_number);
    println!("{}", outcome.result.outcome().message());
    if let Some(tx_hash) = outcome.attempt.tx_hash {
        println!("Transaction successful. Hash: {}", tx_hash);
    }

    if let Ok(jackpot) = controller.refresh_jackpot().await {
        println!("Jackpot is now {} ETH", jackpot.amount);
    }
    Ok(())
}
