use colored::*;
use gemini_studio::{
    gemini::sniff_image_type,
    logger::{self, LogLevel, LoggerConfig},
    Action, GeminiConfig, GenerationRequest, ImageStyle, Mode, Outcome, RenderedImage, Studio,
    TransformKind, TransformationRequest,
};
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Type a description and press Enter to run the current mode.

  /mode generate|transform   switch between Image Generation and Image Transformation
  /style NAME|none           style for generation (Photorealistic, Digital Art, Oil Painting,
                             Watercolor, Sketch, Cartoon, Anime, 3D Rendering, Pixel Art)
  /temperature 0.0-1.0       creativity level
  /negative TEXT|none        what to avoid (generation)
  /image PATH                PNG or JPEG to transform
  /strength 0-100            how much of the original to preserve (transformation)
  /kind style|content|background
  /examples                  list example prompts for the current mode
  /example N                 pick example N
  /use-example               run the picked example
  /status                    show current settings
  /key KEY                   save an API key
  /reset-key                 forget the API key
  /help, /quit";

/// Field values the user has set so far.
struct Form {
    mode: Mode,
    style: Option<ImageStyle>,
    temperature: f32,
    negative_prompt: Option<String>,
    image_path: Option<PathBuf>,
    source_image: Option<Vec<u8>>,
    preservation_strength: u8,
    transform_kind: TransformKind,
}

impl Default for Form {
    fn default() -> Self {
        Self {
            mode: Mode::Generation,
            style: None,
            temperature: gemini_studio::models::DEFAULT_TEMPERATURE,
            negative_prompt: None,
            image_path: None,
            source_image: None,
            preservation_strength: gemini_studio::models::DEFAULT_PRESERVATION_STRENGTH,
            transform_kind: TransformKind::default(),
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let level = env::var("STUDIO_LOG_LEVEL")
        .ok()
        .and_then(|l| LogLevel::parse(&l))
        .unwrap_or(LogLevel::Warn);
    logger::init_with_config(LoggerConfig::interactive().with_level(level))?;
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if !dotenv_loaded {
        log::debug!("No .env file found, using process environment");
    }

    let config = GeminiConfig::from_env();
    logger::log_config_info(&config);

    let mut studio = Studio::new(config.clone());
    let mut form = Form::default();

    println!("{}", "🎨 Gemini Image Studio".bold());
    println!("Create and transform images using Google's Gemini 2.0 model\n");

    if let Some(key) = config.api_key.clone() {
        render(studio.handle(Action::SaveCredential(key)).await);
    }
    if !studio.session().is_configured() {
        println!("To get started, enter your Google API key with access to Gemini models.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&studio, &form);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if let Some(command) = line.strip_prefix('/') {
            if let Flow::Quit = run_command(&mut studio, &mut form, command).await {
                break;
            }
        } else if !studio.session().is_configured() {
            render(studio.handle(Action::SaveCredential(line.to_string())).await);
        } else {
            submit(&mut studio, &form, line).await;
        }
    }

    println!("Bye.");
    Ok(())
}

fn print_prompt(studio: &Studio, form: &Form) {
    let label = if studio.session().is_configured() {
        form.mode.label()
    } else {
        "API key"
    };
    print!("{} ", format!("{}>", label).bright_blue().bold());
    let _ = std::io::stdout().flush();
}

async fn submit(studio: &mut Studio, form: &Form, text: &str) {
    let action = match form.mode {
        Mode::Generation => {
            println!("{}", "Creating your masterpiece...".bright_black());
            Action::Generate(
                GenerationRequest::new(text)
                    .with_style(form.style)
                    .with_temperature(form.temperature)
                    .with_negative_prompt(form.negative_prompt.clone()),
            )
        }
        Mode::Transformation => {
            let Some(source) = form.source_image.clone() else {
                println!("Please upload an image to get started with transformations (/image PATH).");
                return;
            };
            println!("{}", "Transforming your image...".bright_black());
            Action::Transform(
                TransformationRequest::new(source, text)
                    .with_temperature(form.temperature)
                    .with_kind(form.transform_kind)
                    .with_preservation_strength(form.preservation_strength),
            )
        }
    };
    render(studio.handle(action).await);
}

async fn run_command(studio: &mut Studio, form: &mut Form, command: &str) -> Flow {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Flow::Quit,
        "help" => println!("{}", HELP),
        "status" => print_status(studio, form),
        "key" => render(studio.handle(Action::SaveCredential(arg.to_string())).await),
        "reset-key" => render(studio.handle(Action::ResetCredential).await),
        "mode" => match Mode::parse(arg) {
            Some(mode) => {
                form.mode = mode;
                println!("Mode: {}", mode);
            }
            None => warn("Choose a mode: generate or transform."),
        },
        "style" => {
            if arg.is_empty() || arg.eq_ignore_ascii_case("none") {
                form.style = None;
                println!("Style: none");
            } else {
                match ImageStyle::parse(arg) {
                    Some(style) => {
                        form.style = Some(style);
                        println!("Style: {}", style);
                    }
                    None => warn(&format!("Unknown style '{}'. See /help for the list.", arg)),
                }
            }
        }
        "temperature" => match arg.parse::<f32>() {
            Ok(t) if (0.0..=1.0).contains(&t) => {
                form.temperature = t;
                println!("Creativity level: {:.1}", t);
            }
            _ => warn("The creativity level must be a number between 0.0 and 1.0."),
        },
        "negative" => {
            form.negative_prompt = (!arg.is_empty() && !arg.eq_ignore_ascii_case("none"))
                .then(|| arg.to_string());
            println!(
                "Negative prompt: {}",
                form.negative_prompt.as_deref().unwrap_or("none")
            );
        }
        "strength" => match arg.parse::<u8>() {
            Ok(s) if s <= 100 => {
                form.preservation_strength = s;
                println!("Preserve approximately {}% of the original", s);
            }
            _ => warn("The preservation strength must be a whole number from 0 to 100."),
        },
        "kind" => match TransformKind::parse(arg) {
            Some(kind) => {
                form.transform_kind = kind;
                println!("Transformation type: {}", kind);
            }
            None => warn("Choose a transformation type: style, content or background."),
        },
        "image" => load_image(form, arg),
        "examples" => {
            for (i, example) in form.mode.examples().iter().enumerate() {
                println!("  {}. {}", i + 1, example);
            }
        }
        "example" => match arg.parse::<usize>() {
            Ok(n) if n >= 1 => {
                let outcome = studio
                    .handle(Action::SelectExample {
                        mode: form.mode,
                        index: n - 1,
                    })
                    .await;
                render(outcome);
            }
            _ => warn("Pick an example by number, e.g. /example 2."),
        },
        "use-example" => {
            let action = match form.mode {
                Mode::Generation => {
                    println!("{}", "Creating your masterpiece...".bright_black());
                    Action::UseGenerationExample {
                        style: form.style,
                        temperature: form.temperature,
                    }
                }
                Mode::Transformation => {
                    let Some(source) = form.source_image.clone() else {
                        warn("Upload an image first (/image PATH).");
                        return Flow::Continue;
                    };
                    println!("{}", "Transforming your image...".bright_black());
                    Action::UseTransformationExample {
                        source_image: source,
                        temperature: form.temperature,
                    }
                }
            };
            render(studio.handle(action).await);
        }
        other => warn(&format!("Unknown command '/{}'. Type /help.", other)),
    }
    Flow::Continue
}

fn load_image(form: &mut Form, arg: &str) {
    if arg.is_empty() {
        warn("Give the path of a PNG or JPEG image.");
        return;
    }
    let path = PathBuf::from(arg);
    match std::fs::read(&path) {
        Ok(bytes) => match sniff_image_type(&bytes) {
            Ok(media_type) => {
                println!(
                    "Original image: {} ({}, {} bytes)",
                    path.display(),
                    media_type,
                    bytes.len()
                );
                form.image_path = Some(path);
                form.source_image = Some(bytes);
            }
            Err(e) => error(&e.to_string(), None),
        },
        Err(e) => error(&format!("Could not read {}", path.display()), Some(&e.to_string())),
    }
}

fn print_status(studio: &Studio, form: &Form) {
    println!("Mode: {}", form.mode);
    println!(
        "API key: {}",
        if studio.session().is_configured() { "saved" } else { "not set" }
    );
    println!("Creativity level: {:.1}", form.temperature);
    match form.mode {
        Mode::Generation => {
            println!(
                "Style: {}",
                form.style.map(|s| s.name()).unwrap_or("none")
            );
            println!(
                "Negative prompt: {}",
                form.negative_prompt.as_deref().unwrap_or("none")
            );
        }
        Mode::Transformation => {
            println!(
                "Image: {}",
                form.image_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            println!("Transformation type: {}", form.transform_kind);
            println!("Preserve: {}%", form.preservation_strength);
        }
    }
    if let Some(example) = studio.session().last_example_selection() {
        println!("Picked example: {}", example);
    }
}

fn render(outcome: Outcome) {
    match outcome {
        Outcome::CredentialSaved => {
            println!("{}", "API key saved! You can now use the app.".green())
        }
        Outcome::CredentialCleared => {
            println!("API key cleared. Enter your Google API key to continue.")
        }
        Outcome::ExampleSelected(example) => {
            println!("Example: {}", example.italic());
            println!("{}", "Run it with /use-example".bright_black());
        }
        Outcome::Image(image) => render_image(image),
        Outcome::Warning { message, details } => {
            warn(&message);
            if let Some(details) = details.filter(|d| !d.is_empty()) {
                println!("{}", details.bright_black());
            }
        }
        Outcome::Error { message, details } => error(&message, details.as_deref()),
    }
}

fn render_image(image: RenderedImage) {
    let heading = match image.mode {
        Mode::Generation => "### Your Generated Image",
        Mode::Transformation => "### Transformed Image",
    };
    println!("{}", heading.bold());

    match std::fs::write(image.download.file_name, &image.bytes) {
        Ok(()) => println!(
            "{} {} ({}, {} bytes)",
            "Saved to".green(),
            image.download.file_name,
            image.download.media_type,
            image.bytes.len()
        ),
        Err(e) => error(
            &format!("Could not save {}", image.download.file_name),
            Some(&e.to_string()),
        ),
    }

    if let Some(commentary) = image.commentary {
        println!("{}", "Model's comments:".bold());
        println!("{}", commentary);
    }
}

fn warn(message: &str) {
    println!("{}", message.yellow());
}

fn error(message: &str, details: Option<&str>) {
    println!("{}", message.red().bold());
    if let Some(details) = details {
        println!("{}", details.red());
    }
}
