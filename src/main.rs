use clap::Parser;
use console::style;
use env_logger::Env;
use stegsweep::cli::Args;
use stegsweep::reporter::{self, Palette};
use stegsweep::{form, RunnerConfig, Session, StegError, StegResult};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet flags
    let log_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    // Args carry the passphrase, so they are not logged wholesale.
    log::debug!(
        "stegsweep starting: file={:?} tools={:?} tool_dir={:?}",
        args.file,
        args.tools,
        args.tool_dir
    );

    let config = RunnerConfig::from(&args);

    if args.gui {
        match form::launch(config).await {
            Ok(()) => {}
            Err(StegError::Interrupted) => {
                println!("\n{}", style("Analysis interrupted by user").yellow());
                // The session is already cleaned up; the blocked stdin reader thread is not waited for.
                std::process::exit(130);
            }
            Err(e) => println!("{}", style(format!("Error: {}", e)).red()),
        }
        return;
    }

    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(e) => {
            println!("{}", style(format!("Error: {}", e)).red());
            return;
        }
    };

    tokio::select! {
        result = run(&mut session, &args) => {
            if let Err(e) = result {
                println!("{}", style(format!("Error: {}", e)).red());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", style("Analysis interrupted by user").yellow());
        }
    }

    session.cleanup();
}

async fn run(session: &mut Session, args: &Args) -> StegResult<()> {
    if args.check_tools {
        let availability = session.analyzer().runner().probe().await;
        print!("{}", reporter::render_availability(&availability, Palette::Colored));
        return Ok(());
    }

    let Some(file) = args.file.as_deref() else {
        return Ok(());
    };

    let outcome = session.analyze(file, &args.password).await;
    print!("{}", reporter::render_outcome(&outcome, Palette::Colored));

    if let Some(output) = &args.output {
        session.save(output)?;
        println!(
            "\n{}",
            style(format!("Results saved to: {}", output.display())).green()
        );
    }

    Ok(())
}
