use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use call_transactions::transactions::FnWork;
use call_transactions::{
    config, init_telemetry, shutdown_telemetry, transaction_metrics, CallTransaction,
    CallTransactionsConfig, SerialExecutor, SerialTransaction, Transaction, TransactionContext,
    TransactionManager, TransactionResult,
};

#[derive(Parser)]
#[command(name = "call-transactions")]
#[command(about = "Run chains of call operations with exactly-once completion and watchdogs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated serial chain through the transaction manager
    Simulate {
        /// Number of steps in the chain
        #[arg(long, default_value = "3", help = "Number of sub transactions in the chain")]
        steps: usize,
        /// Time each step takes
        #[arg(long, default_value = "50", help = "Milliseconds each step takes to finish")]
        step_ms: u64,
        /// Step that reports failure (1-based)
        #[arg(long, help = "Make this step (1-based) report a failure")]
        fail_at: Option<usize>,
        /// Step that never reports (1-based)
        #[arg(long, help = "Make this step (1-based) hang until its watchdog fires")]
        hang_at: Option<usize>,
        /// Watchdog for the whole chain
        #[arg(long, help = "Chain watchdog in milliseconds (defaults to step watchdog x (steps + 1))")]
        timeout_ms: Option<u64>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            steps,
            step_ms,
            fail_at,
            hang_at,
            timeout_ms,
        } => {
            let settings = config()?;
            init_telemetry(&settings.observability)?;
            let result = tokio::runtime::Runtime::new()?.block_on(async {
                simulate_command(settings, steps, step_ms, fail_at, hang_at, timeout_ms).await
            });
            shutdown_telemetry();
            result
        }
        Commands::Config => config_command(),
    }
}

async fn simulate_command(
    settings: &CallTransactionsConfig,
    steps: usize,
    step_ms: u64,
    fail_at: Option<usize>,
    hang_at: Option<usize>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let executor = SerialExecutor::spawn("call-transactions")?;
    let step_context = TransactionContext::from_config(executor.clone(), &settings.transactions);
    let chain_timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| step_context.timeout_limit() * (steps as u32 + 1));
    let chain_context = step_context.with_timeout_limit(chain_timeout);

    println!(
        "🔗 Simulating {} steps ({}ms each, step watchdog {}ms, chain watchdog {}ms)",
        steps,
        step_ms,
        step_context.timeout_limit().as_millis(),
        chain_timeout.as_millis()
    );

    let sub_transactions: Vec<Arc<dyn Transaction>> = (1..=steps)
        .map(|step| simulated_step(step, step_ms, fail_at, hang_at, &step_context))
        .collect();

    let chain = SerialTransaction::with_final_step(
        "simulated-call",
        sub_transactions,
        FnWork::new(|| async {
            println!("   ✅ all steps done");
            TransactionResult::succeeded()
        }),
        &chain_context,
    );

    let manager = TransactionManager::new(executor);
    match manager.submit(chain).await {
        Ok(result) => println!("🎉 Chain {}", result),
        Err(e) => println!("❌ {}", e),
    }

    transaction_metrics().log_stats();
    Ok(())
}

fn simulated_step(
    step: usize,
    step_ms: u64,
    fail_at: Option<usize>,
    hang_at: Option<usize>,
    context: &TransactionContext,
) -> Arc<dyn Transaction> {
    let name = format!("step-{step}");
    let label = name.clone();
    CallTransaction::from_fn(name, context, move || {
        let label = label.clone();
        async move {
            println!("   ▶️  {label} started");
            if hang_at == Some(step) {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(Duration::from_millis(step_ms)).await;
            if fail_at == Some(step) {
                println!("   💥 {label} failed");
                return TransactionResult::failed(format!("{label} reported an error"));
            }
            println!("   ✔️  {label} finished");
            TransactionResult::succeeded()
        }
    })
}

fn config_command() -> Result<()> {
    let settings = config()?;
    print!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
