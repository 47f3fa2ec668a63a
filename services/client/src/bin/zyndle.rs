//! services/client/src/bin/zyndle.rs

use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use client_lib::{app::build_workflow, config::Config, error::ClientError, render};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zyndle_core::{
    AnalyzeOutcome, AuthOutcome, Credentials, Event, ScreenKind, Tab, Workflow,
};

#[derive(Parser)]
#[command(name = "zyndle", about = "Summaries, chat and quizzes for YouTube videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "ZYNDLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in to an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ZYNDLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Analyze a video and open its workspace
    Analyze {
        url: String,
        /// Ask a question about the video (repeatable)
        #[arg(long = "ask")]
        questions: Vec<String>,
        /// Take a quiz on the video
        #[arg(long)]
        quiz: bool,
        /// Save a note on the video
        #[arg(long)]
        note: Option<String>,
        /// List notes saved for the video
        #[arg(long)]
        notes: bool,
    },
    /// Show learning progress and insights
    Progress,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Parse Arguments, Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Build the Workflow ---
    let workflow = build_workflow(&config)?;

    // --- 3. Run the Command ---
    match cli.command {
        Command::Register {
            email,
            name,
            password,
        } => {
            workflow.dispatch(Event::ClickGetStarted)?;
            sign_in(&workflow, Credentials { email, full_name: name, password }).await
        }
        Command::Login { email, password } => {
            workflow.dispatch(Event::ClickSignIn)?;
            let credentials = Credentials {
                email,
                full_name: String::new(),
                password,
            };
            sign_in(&workflow, credentials).await
        }
        Command::Logout => {
            workflow.logout().await;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            match workflow.auth().current_user().await {
                Some(user) => println!("{} <{}>", user.full_name, user.email),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Command::Analyze {
            url,
            questions,
            quiz,
            note,
            notes,
        } => analyze(&workflow, &url, &questions, quiz, note.as_deref(), notes).await,
        Command::Progress => {
            if workflow.dispatch(Event::ClickViewProgress)? != ScreenKind::Progress {
                return Err(not_signed_in());
            }
            let view = workflow.load_progress().await?;
            print!("{}", render::progress(&view));
            Ok(())
        }
    }
}

async fn sign_in(workflow: &Workflow, credentials: Credentials) -> Result<(), ClientError> {
    match workflow.submit_auth(credentials).await? {
        AuthOutcome::SignedIn(user) => {
            println!("Signed in as {} <{}>.", user.full_name, user.email);
            Ok(())
        }
        AuthOutcome::Rejected(e) => Err(e.into()),
        AuthOutcome::Abandoned => Err(ClientError::Internal("sign-in was abandoned".into())),
    }
}

async fn analyze(
    workflow: &Workflow,
    url: &str,
    questions: &[String],
    take_quiz: bool,
    note: Option<&str>,
    list_notes: bool,
) -> Result<(), ClientError> {
    if workflow.dispatch(Event::ClickContinueAnalysis)? != ScreenKind::VideoInput {
        return Err(not_signed_in());
    }

    eprintln!("Analyzing {} ...", url);
    let session = match workflow.submit_url(url).await? {
        AnalyzeOutcome::Ready(session) => session,
        AnalyzeOutcome::Failed(e) => return Err(e.into()),
        AnalyzeOutcome::SessionExpired => return Err(not_signed_in()),
        AnalyzeOutcome::Abandoned => {
            return Err(ClientError::Internal("analysis was abandoned".into()))
        }
    };
    print!("{}", render::analysis(session.analysis()));

    if !questions.is_empty() {
        workflow.select_tab(Tab::Chat).await?;
        for question in questions {
            workflow.send_chat(question).await?;
        }
        println!();
        print!("{}", render::chat(&session.chat_log()));
    }

    if take_quiz {
        workflow.select_tab(Tab::Quiz).await?;
        if let Some(state) = session.quiz() {
            println!();
            print!("{}", render::quiz(&state));
            for (i, question) in state.questions().iter().enumerate() {
                let choice = prompt_choice(i + 1, question.options.len())?;
                session.select_answer(i, choice)?;
            }
            let report = session.submit_quiz()?;
            if let Some(graded) = session.quiz() {
                println!();
                print!("{}", render::quiz(&graded));
            }
            println!("{}", render::quiz_report(&report));
        }
    }

    if let Some(content) = note {
        let created = session.create_note(content, None).await?;
        println!("Saved note {}.", created.id);
    }
    if list_notes {
        workflow.select_tab(Tab::Notes).await?;
        println!();
        print!("{}", render::notes(&session.notes()));
    }

    session.flush_telemetry().await;
    Ok(())
}

/// Reads an option letter (or number) for question `number` from stdin.
fn prompt_choice(number: usize, options: usize) -> Result<usize, ClientError> {
    let stdin = std::io::stdin();
    loop {
        print!("Answer for question {}: ", number);
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(ClientError::Internal("input closed before the quiz was finished".into()));
        }
        let input = line.trim();
        let choice = match input.chars().next() {
            Some(c) if c.is_ascii_alphabetic() && input.len() == 1 => {
                Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
            }
            _ => input.parse::<usize>().ok().and_then(|n| n.checked_sub(1)),
        };
        match choice {
            Some(c) if c < options => return Ok(c),
            _ => println!("Please pick one of the listed options."),
        }
    }
}

fn not_signed_in() -> ClientError {
    ClientError::Internal("not signed in; run `zyndle login` first".into())
}
