use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use numguess_core::{EventFilter, LotteryController, LotteryEvent};

pub async fn info(controller: &LotteryController, max_players: usize) -> anyhow::Result<()> {
    controller.connect().await?;
    let info = controller.info(max_players).await?;

    println!("Lottery contract {}:", info.contract);
    println!("  Play cost: {} ETH", info.play_cost);
    println!("  Owner: {}", info.owner);
    println!("  Jackpot: {} ETH", info.jackpot.amount);
    println!(
        "  Last jackpot: {}",
        info.last_jackpot.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    if info.recent_players.is_empty() {
        println!("No players since the last jackpot.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Player"]);
    for (index, player) in info.recent_players.iter().enumerate() {
        table.add_row(vec![index.to_string(), player.to_string()]);
    }
    println!("Players since last jackpot:");
    println!("{}", table);
    Ok(())
}

fn event_row(event: &LotteryEvent) -> Vec<String> {
    let block = |b: Option<u64>| b.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string());
    match event {
        LotteryEvent::Played(e) => vec![
            block(e.block_number),
            "Played".to_string(),
            e.player.to_string(),
            format!("{} vs {}", e.player_number, e.contract_number),
        ],
        LotteryEvent::Jackpot(e) => vec![
            block(e.block_number),
            "Jackpot".to_string(),
            e.winner.to_string(),
            format!("{} ETH", e.amount),
        ],
    }
}

pub async fn history(controller: &LotteryController, from_block: u64) -> anyhow::Result<()> {
    controller.connect().await?;
    let contract = controller
        .contract()
        .ok_or(numguess_core::LotteryError::NotConnected)?;
    let events = contract.events(from_block, None).await?;

    if events.is_empty() {
        println!("No lottery events since block {}", from_block);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Block", "Event", "Address", "Details"]);
    for event in &events {
        table.add_row(event_row(event));
    }
    println!("{}", table);
    Ok(())
}

pub async fn watch(controller: &LotteryController) -> anyhow::Result<()> {
    controller.connect().await?;
    let mut subscription = controller.watch(EventFilter::Any).await?;
    println!("Watching {} (Ctrl-C to stop)", controller.config().contract_address);

    loop {
        tokio::select! {
            event = subscription.next() => match event {
                Some(event) => println!("{}", event_row(&event).join("  ")),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    subscription.cancel();
    Ok(())
}

pub async fn withdraw(controller: &LotteryController, yes: bool) -> anyhow::Result<()> {
    controller.connect().await?;
    let jackpot = controller.refresh_jackpot().await?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Withdraw {} ETH to the owner?", jackpot.balance))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Withdrawal cancelled.");
            return Ok(());
        }
    }

    let tx_hash = controller.withdraw().await?;
    println!("Withdrawal successful. Hash: {}", tx_hash);
    Ok(())
}
