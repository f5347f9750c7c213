//! MentorAI CLI - Learning Assistant
//!
//! A command-line front end for the MentorAI learning features: reverse
//! teaching, multi-persona explanations, failure simulation, knowledge gap
//! prediction, anti-pattern detection, reading aids and spoken playback.

use std::env;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use mentorai_core::features::{
    AntiPatternsInput, FailureSimulationInput, KnowledgeGapsInput, ReverseTeachInput,
    SummarizeInput, TranslateInput,
};
use mentorai_core::{
    Actions, ApiSettings, Config, FormInput, FormSession, KokoroSynthesizer, MentorError,
    OpenAICompatibleModel, OrchestrationMode, OrchestratorEvent, PersonaForm, PersonaTurn,
    PlaybackController, PlaybackState, SkillDomain, SkillTree, WavFileOutput, default_config,
    split_skills,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/mentorai.toml";

#[derive(Parser)]
#[command(
    name = "mentorai",
    version,
    about = "MentorAI - An AI learning assistant",
    long_about = "A CLI for learning with AI: teach concepts back, hear them explained by several personas, and listen to the results. Works with any OpenAI-compatible API."
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "MENTORAI_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured model name
    #[arg(short, long, global = true, value_name = "MODEL")]
    model: Option<String>,

    /// Voice used for spoken output (see `mentorai voices`)
    #[arg(long, global = true, value_name = "VOICE")]
    voice: Option<String>,

    /// Directory where spoken output is written as WAV files
    #[arg(long, global = true, default_value = "audio", value_name = "DIR")]
    audio_dir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Teach a concept to the AI and get questions and gaps back
    Teach {
        /// The concept you are explaining
        concept: String,
        /// Your explanation of the concept
        #[arg(short, long)]
        explanation: String,
        /// Read the AI's understanding aloud
        #[arg(long)]
        listen: bool,
    },

    /// Hear a concept explained by two or three personas
    Personas {
        /// The concept to explain
        concept: String,
        /// A persona (specify 2 or 3 times; defaults come from the config)
        #[arg(short, long = "persona", action = ArgAction::Append, value_name = "PERSONA")]
        personas: Vec<String>,
        /// Orchestration mode: fan-out or single-call
        #[arg(long, value_name = "MODE")]
        mode: Option<String>,
        /// Read the N-th turn aloud (1-based)
        #[arg(long, value_name = "N")]
        listen: Option<usize>,
    },

    /// Simulate a realistic failure and learn from it
    Failure {
        #[arg(short, long)]
        topic: String,
        /// Comma-separated skills
        #[arg(short, long)]
        skills: String,
        /// Where the failure happens
        #[arg(short, long)]
        context: String,
    },

    /// Predict knowledge gaps for a career goal
    Gaps {
        #[arg(short, long)]
        goal: String,
        /// Comma-separated skills
        #[arg(short, long)]
        skills: String,
        /// How you prefer to learn
        #[arg(short, long)]
        prefers: Option<String>,
    },

    /// Detect unproductive study habits
    AntiPatterns {
        /// What you have been doing to learn
        #[arg(long)]
        history: String,
        /// What you are doing right now
        #[arg(long)]
        activity: String,
    },

    /// Extract key notes from a text
    Summarize {
        /// The text (or use --file)
        text: Option<String>,
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
        #[arg(long)]
        listen: bool,
    },

    /// Translate a text
    Translate {
        /// The text (or use --file)
        text: Option<String>,
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Target language
        #[arg(short, long, value_name = "LANGUAGE")]
        to: String,
        #[arg(long)]
        listen: bool,
    },

    /// Read a text aloud into a WAV file
    Listen {
        text: String,
        /// Identifier for the clip
        #[arg(long, default_value = "main")]
        id: String,
    },

    /// Show a skill tree or the ancestry of one skill
    Skills {
        /// programming or mathematics
        domain: String,
        /// Show only the prerequisites of this skill
        #[arg(long, value_name = "ID")]
        skill: Option<String>,
    },

    /// List the voices offered for spoken output
    Voices,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(ref model) = cli.model {
        config.model.name = model.clone();
    }
    let voice = match cli.voice {
        Some(ref id) => config.voice(id)?.id.clone(),
        None => config.voices.default_voice.clone(),
    };
    let audio = AudioSettings {
        voice,
        dir: cli.audio_dir.clone(),
    };

    match cli.command {
        Command::Skills { domain, skill } => show_skills(&domain, skill.as_deref())?,
        Command::Voices => show_voices(&config, &audio.voice),
        Command::Listen { text, id } => speak(&audio, &text, &id).await?,
        command => run_feature(command, config, &audio).await?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "mentorai=info,mentorai_core=info",
        1 => "mentorai=debug,mentorai_core=debug",
        _ => "mentorai=trace,mentorai_core=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<Config, MentorError> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH),
        None => {
            debug!("No config file found, using built-in defaults");
            Ok(default_config())
        }
    }
}

fn api_settings() -> ApiSettings {
    // Get API configuration from environment
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    ApiSettings::new(api_base, api_key)
}

struct AudioSettings {
    voice: String,
    dir: PathBuf,
}

async fn run_feature(
    command: Command,
    config: Config,
    audio: &AudioSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = Arc::new(OpenAICompatibleModel::new(&api_settings(), &config.model)?);
    info!(model = %config.model.name, "Using model");
    let actions = Actions::new(model, config)?;

    match command {
        Command::Teach {
            concept,
            explanation,
            listen,
        } => {
            let input = ReverseTeachInput {
                concept,
                student_explanation: explanation,
            };
            check_form(&input, actions.config());
            print_header("Reverse Teaching", &input.concept);

            if let Some(out) = submit("Thinking", actions.reverse_teach(&input)).await {
                print_section("AI's Understanding", &out.ai_understanding);
                print_section("Questions For You", &out.questions_for_student);
                print_section("Identified Gaps", &out.identified_gaps);
                if listen {
                    speak(audio, &out.ai_understanding, "understanding").await?;
                }
            }
        }

        Command::Personas {
            concept,
            personas,
            mode,
            listen,
        } => {
            let form = if personas.is_empty() {
                PersonaForm::with_defaults(concept, actions.config())
            } else {
                PersonaForm { concept, personas }
            };
            let request = match form.to_request(actions.config()) {
                Ok(request) => request,
                Err(e) => exit_invalid(&e),
            };

            let mut actions = actions.with_orchestrator_callback(create_console_callback());
            if let Some(mode) = mode {
                let mode: OrchestrationMode = match mode.parse() {
                    Ok(mode) => mode,
                    Err(e) => exit_invalid(&e),
                };
                actions = actions.map_orchestrator(|o| o.with_mode(mode));
            }

            print_header("Multi-Persona Explanation", request.concept());
            println!("{}", "Personas:".bold());
            for (i, persona) in request.personas().iter().enumerate() {
                println!("  {}. {}", i + 1, persona.bright_cyan());
            }
            println!("{}", "─".repeat(70).dimmed());

            let turns = submit("Generating explanations", async {
                Ok::<_, MentorError>(actions.explain_personas(&request).await)
            })
            .await
            .unwrap_or_default();
            print_turns(&turns);

            if let Some(n) = listen {
                match turns.get(n.wrapping_sub(1)) {
                    Some(turn) => speak(audio, &turn.text, &format!("persona-{}", n)).await?,
                    None => eprintln!(
                        "{} There is no turn {} (1-{}).",
                        "Error:".red().bold(),
                        n,
                        turns.len()
                    ),
                }
            }
        }

        Command::Failure {
            topic,
            skills,
            context,
        } => {
            let input = FailureSimulationInput {
                topic,
                user_skills: split_skills(&skills),
                failure_context: context,
            };
            check_form(&input, actions.config());
            print_header("Failure Simulation", &input.topic);

            if let Some(out) = submit("Simulating", actions.simulate_failure(&input)).await {
                print_section("Scenario", &out.scenario_description);
                print_section("What Went Wrong", &out.failure_analysis);
                print_section("Recommendations", &out.learning_recommendations);
            }
        }

        Command::Gaps {
            goal,
            skills,
            prefers,
        } => {
            let input = KnowledgeGapsInput {
                career_goal: goal,
                current_skills: split_skills(&skills),
                learning_preferences: prefers,
            };
            check_form(&input, actions.config());
            print_header("Knowledge Gaps", &input.career_goal);

            if let Some(out) = submit("Analyzing", actions.predict_gaps(&input)).await {
                print_list("Predicted Gaps", &out.predicted_gaps);
                print_list("Suggested Resources", &out.suggested_resources);
            }
        }

        Command::AntiPatterns { history, activity } => {
            let input = AntiPatternsInput {
                learning_history: history,
                current_activity: activity,
            };
            check_form(&input, actions.config());
            print_header("Learning Anti-Patterns", &input.current_activity);

            if let Some(out) = submit("Analyzing", actions.identify_anti_patterns(&input)).await {
                print_list("Anti-Patterns", &out.anti_patterns);
                print_section(
                    &format!("Intervention ({})", out.intervention.kind),
                    &out.intervention.message,
                );
            }
        }

        Command::Summarize { text, file, listen } => {
            let input = SummarizeInput {
                text: read_text(text, file.as_deref())?,
            };
            check_form(&input, actions.config());
            print_header("Key Notes", &excerpt(&input.text));

            if let Some(out) = submit("Summarizing", actions.summarize(&input)).await {
                print_list("Key Notes", &out.key_notes);
                if listen {
                    speak(audio, &out.key_notes.join(" "), "summary").await?;
                }
            }
        }

        Command::Translate {
            text,
            file,
            to,
            listen,
        } => {
            let input = TranslateInput {
                text: read_text(text, file.as_deref())?,
                target_language: to,
            };
            check_form(&input, actions.config());
            print_header(
                &format!("Translation ({})", input.target_language),
                &excerpt(&input.text),
            );

            if let Some(out) = submit("Translating", actions.translate(&input)).await {
                print_section("Translated Text", &out.translated_text);
                if listen {
                    speak(audio, &out.translated_text, "translation").await?;
                }
            }
        }

        Command::Listen { .. } | Command::Skills { .. } | Command::Voices => {}
    }

    Ok(())
}

/// Validate form input, printing the failing field and exiting on error.
fn check_form(input: &impl FormInput, config: &Config) {
    if let Err(e) = input.validate(config) {
        exit_invalid(&e);
    }
}

fn exit_invalid(e: &MentorError) -> ! {
    let (label, message) = invalid_input_message(e);
    eprintln!("{} {}", label.red().bold(), message.red());
    std::process::exit(1);
}

/// Label and text for rejected input: the offending field for form errors.
fn invalid_input_message(e: &MentorError) -> (String, String) {
    match e {
        MentorError::Validation { field, message } => (format!("{}:", field), message.clone()),
        other => ("Error:".to_string(), other.to_string()),
    }
}

/// Run an action as a form submission, reporting a failure inline.
async fn submit<T, F>(label: &str, action: F) -> Option<T>
where
    T: Clone,
    F: Future<Output = Result<T, MentorError>>,
{
    let session = FormSession::new();
    println!("{}", format!("{}...", label).dimmed());
    session.submit(action).await;

    if let Some(error) = session.last_error().await {
        eprintln!(
            "{} {}",
            "Error:".red().bold(),
            "Something went wrong. Please try again.".red()
        );
        debug!(%error, "Action failed");
        return None;
    }
    session.result().await
}

/// Synthesize `text` and write it to the audio directory.
async fn speak(
    audio: &AudioSettings,
    text: &str,
    request_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "Preparing audio...".dimmed());
    let synth = Arc::new(KokoroSynthesizer::new(audio.voice.clone()).await?);
    let output = Arc::new(WavFileOutput::new(&audio.dir));

    let controller = PlaybackController::new(synth, output.clone())
        .with_voice(audio.voice.clone())
        .with_callback(Box::new(|state: &PlaybackState| {
            debug!(?state, "Playback")
        }));

    match controller.request(text, request_id).await {
        PlaybackState::Playing(_) => {
            if let Some(clip) = controller.current_clip().await {
                println!(
                    "{} {} ({:.1}s)",
                    "🔊 Saved".bright_green(),
                    output.path_for(&clip).display(),
                    clip.audio.duration().as_secs_f32()
                );
            }
            controller.on_playback_ended().await;
        }
        _ => eprintln!(
            "{} {}",
            "Error:".red().bold(),
            "Could not generate audio.".red()
        ),
    }
    Ok(())
}

fn show_skills(domain: &str, skill: Option<&str>) -> Result<(), MentorError> {
    let tree = SkillTree::for_domain(SkillDomain::parse(domain)?);

    let (title, skills) = match skill {
        Some(id) => {
            let target = tree.skill(id)?;
            (format!("Path to {}", target.name), tree.ancestry(id)?)
        }
        None => (format!("{} Skill Tree", tree.domain()), tree.ordered()),
    };

    println!();
    println!("{}", title.bright_blue().bold());
    println!("{}", "─".repeat(70).dimmed());
    for s in skills {
        let deps = if s.dependencies.is_empty() {
            String::new()
        } else {
            format!("  ← {}", s.dependencies.join(", "))
        };
        println!(
            "  {} {} {}{}",
            format!("L{}", s.level).yellow(),
            s.name.bright_cyan(),
            format!("({})", s.id).dimmed(),
            deps.dimmed()
        );
    }
    println!();
    Ok(())
}

fn show_voices(config: &Config, selected: &str) {
    println!();
    println!("{}", "Voices:".bold());
    for v in &config.voices.available {
        let marker = if v.id == selected { "*" } else { " " };
        println!(
            "  {} {} {}",
            marker.bright_green(),
            v.name.bright_cyan(),
            format!("({})", v.id).dimmed()
        );
    }
    println!();
}

fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String, MentorError> {
    match (text, file) {
        (_, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            MentorError::validation("text", format!("Failed to read {}: {}", path.display(), e))
        }),
        (Some(text), None) => Ok(text),
        (None, None) => Ok(String::new()),
    }
}

fn excerpt(text: &str) -> String {
    let first: String = text.chars().take(60).collect();
    if first.len() < text.len() {
        format!("{}…", first.trim_end())
    } else {
        first
    }
}

/// Create a callback that prints orchestration progress to the console.
fn create_console_callback() -> Box<dyn Fn(OrchestratorEvent) + Send + Sync> {
    Box::new(move |event| match event {
        OrchestratorEvent::BatchStart { mode, count } => {
            println!(
                "{}",
                format!("  {} personas, {} mode", count, mode).dimmed()
            );
        }
        OrchestratorEvent::PersonaStart { .. } => {}
        OrchestratorEvent::PersonaComplete { index, persona } => {
            println!("  {} {}. {}", "✓".bright_green(), index + 1, persona.dimmed());
        }
        OrchestratorEvent::PersonaFailed { index, persona, .. } => {
            println!("  {} {}. {}", "✗".bright_red(), index + 1, persona.dimmed());
        }
        OrchestratorEvent::BatchComplete { failed, .. } => {
            if failed > 0 {
                println!(
                    "{}",
                    format!("  {} persona(s) could not participate.", failed).yellow()
                );
            }
        }
    })
}

fn print_header(title: &str, subject: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - {}", "MentorAI".bold(), title)
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), subject.bright_white());
    println!();
}

fn print_section(title: &str, body: &str) {
    println!("{} {}", "▶".bright_cyan(), title.bright_cyan().bold());
    for line in textwrap(body, 66).lines() {
        println!("  {}", line);
    }
    println!();
}

fn print_list(title: &str, items: &[String]) {
    println!("{} {}", "▶".bright_cyan(), title.bright_cyan().bold());
    for item in items {
        let wrapped = textwrap(item, 62);
        let mut lines = wrapped.lines();
        if let Some(first) = lines.next() {
            println!("  • {}", first);
        }
        for line in lines {
            println!("    {}", line);
        }
    }
    println!();
}

fn print_turns(turns: &[PersonaTurn]) {
    println!();
    for (i, turn) in turns.iter().enumerate() {
        println!(
            "{} {}",
            format!("{}.", i + 1).yellow(),
            turn.persona.bright_cyan().bold()
        );
        for line in textwrap(&turn.text, 66).lines() {
            println!("  {}", line);
        }
        println!();
    }
}

/// Simple text wrapping that keeps paragraph breaks.
fn textwrap(text: &str, width: usize) -> String {
    text.lines()
        .map(|paragraph| wrap_paragraph(paragraph, width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_paragraph(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_line_len + word_len + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word_len;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textwrap_keeps_paragraphs() {
        let wrapped = textwrap("one two three four\nfive", 9);
        assert_eq!(wrapped, "one two\nthree\nfour\nfive");
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short"), "short");
        assert!(excerpt(&"word ".repeat(30)).ends_with('…'));
    }

    #[test]
    fn test_cli_parses_personas() {
        let cli = Cli::parse_from([
            "mentorai", "personas", "Recursion", "-p", "A pirate", "-p", "A poet", "--mode",
            "single-call", "--listen", "2",
        ]);
        match cli.command {
            Command::Personas {
                concept,
                personas,
                mode,
                listen,
            } => {
                assert_eq!(concept, "Recursion");
                assert_eq!(personas, vec!["A pirate", "A poet"]);
                assert_eq!(mode.as_deref(), Some("single-call"));
                assert_eq!(listen, Some(2));
            }
            _ => panic!("expected personas"),
        }
    }

    #[test]
    fn test_invalid_input_message() {
        let err = "round-robin".parse::<OrchestrationMode>().unwrap_err();
        let (label, message) = invalid_input_message(&err);
        assert_eq!(label, "Error:");
        assert_eq!(message, "Unknown orchestration mode: round-robin");

        let err = MentorError::validation("concept", "Please enter a concept.");
        assert_eq!(
            invalid_input_message(&err),
            ("concept:".to_string(), "Please enter a concept.".to_string())
        );
    }

    #[test]
    fn test_read_text_prefers_file() {
        let dir = std::env::temp_dir().join("mentorai-cli-read-text");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notes.txt");
        std::fs::write(&path, "from file").unwrap();

        assert_eq!(read_text(Some("inline".into()), Some(&path)).unwrap(), "from file");
        assert_eq!(read_text(Some("inline".into()), None).unwrap(), "inline");
    }
}
