use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use vanish::config::Config;
use vanish::conversation::{decode_response, Conversation, DISPATCH_FAILED};
use vanish::raster::{available_fonts, rasterizer_for};
use vanish::terminal::{self, Screen, TerminalGuard};
use vanish::{AnimationState, ClockScheduler, InputEvent, Key, Scheduler, VanishInput, Visibility, Wakeup};

const FRAMES_PER_SECOND: u32 = 60;

/// How long to block on input when nothing is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// A terminal chat input whose messages vanish into particles.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The configuration file to use.
    #[clap(short, long, env = "VANISH_CONFIG")]
    config: Option<PathBuf>,

    /// Render text with this font: `cell` or a FIGlet font name.
    #[clap(long)]
    font: Option<String>,

    /// Seed particle trajectories for a reproducible dissolve.
    #[clap(long)]
    seed: Option<u64>,

    /// How long a response stays on screen before vanishing.
    #[clap(long)]
    dwell_ms: Option<u64>,

    /// Write logs to this file. The filter is read from VANISH_LOG.
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// List the usable fonts and exit.
    #[clap(long)]
    list_fonts: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let env = env_logger::Env::default().filter_or("VANISH_LOG", "warn");
    let mut builder = env_logger::Builder::from_env(env);
    match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // anything but errors would scribble over the alternate screen
        None => {
            builder.filter_level(log::LevelFilter::Error);
        }
    }
    builder.try_init().context("initializing logger")?;
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(font) = &cli.font {
        config.font = font.clone();
    }
    if let Some(dwell_ms) = cli.dwell_ms {
        config.dwell_ms = dwell_ms;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

/// Map a terminal key press to a text edit. Other control chords are not text.
fn edit_key(key: &KeyEvent) -> Option<Key> {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('u') if control => Some(Key::ClearLine),
        KeyCode::Char(_) if control => None,
        KeyCode::Char(ch) => Some(Key::Char(ch)),
        KeyCode::Backspace => Some(Key::Backspace),
        _ => None,
    }
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Quit,
}

struct App {
    scheduler: ClockScheduler,
    input: VanishInput,
    response: VanishInput,
    input_events: Receiver<InputEvent>,
    response_events: Receiver<InputEvent>,
    conversation: Conversation,
    pending_reply: Option<String>,
}

impl App {
    fn new(config: &Config) -> anyhow::Result<Self> {
        let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
        let (input_sender, input_events) = channel();
        let (response_sender, response_events) = channel();
        let input = VanishInput::new(
            config.input_options(false, seed),
            rasterizer_for(&config.font).context("loading font")?,
            Box::new(input_sender),
        );
        let response = VanishInput::new(
            config.input_options(true, seed.wrapping_add(1)),
            rasterizer_for(&config.font).context("loading font")?,
            Box::new(response_sender),
        );
        let conversation = Conversation::new(config.webhooks.clone(), fastrand::Rng::with_seed(seed));
        let mut app = Self {
            scheduler: ClockScheduler::new(FRAMES_PER_SECOND),
            input,
            response,
            input_events,
            response_events,
            conversation,
            pending_reply: None,
        };
        app.input.mount(&mut app.scheduler);
        app.response.mount(&mut app.scheduler);
        Ok(app)
    }

    fn wake(&mut self, wakeup: Wakeup) {
        self.input.wake(wakeup, &mut self.scheduler);
        self.response.wake(wakeup, &mut self.scheduler);
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        let scheduler: &mut dyn Scheduler = &mut self.scheduler;
        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('c') if control => return Flow::Quit,
            KeyCode::Char('n') if control => {
                if self.pending_reply.is_none() {
                    self.conversation.reset();
                }
            }
            KeyCode::Char('x') if control => self.conversation.clear_override(),
            KeyCode::Enter => {
                let selected = self.conversation.palette_matches(self.input.value()).first().map(|w| w.name.clone());
                match selected {
                    Some(name) => {
                        self.conversation.select_webhook(&name);
                        self.input.replace_value("");
                    }
                    None => self.input.handle_key(Key::Enter, scheduler),
                }
            }
            _ => {
                if let Some(edit) = edit_key(&key) {
                    self.input.handle_key(edit, scheduler);
                }
            }
        }
        Flow::Continue
    }

    fn on_visibility(&mut self, visibility: Visibility) {
        if let Some(wakeup) = self.scheduler.visibility_changed(visibility) {
            self.wake(wakeup);
        }
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.input_events.try_recv() {
            match event {
                InputEvent::Changed(text) => log::debug!("input changed: {text}"),
                InputEvent::Submitted(text) => self.dispatch(&text),
                InputEvent::ResponseConsumed => (),
            }
        }
        while let Ok(event) = self.response_events.try_recv() {
            if event == InputEvent::ResponseConsumed {
                if let Some(reply) = self.pending_reply.take() {
                    self.conversation.push_message(&reply, false);
                }
            }
        }
        let busy = self.pending_reply.is_some() || self.response.state() != AnimationState::Idle;
        self.input.set_disabled(busy);
    }

    /// Answer locally: the reply is built the way a webhook response would be decoded.
    fn dispatch(&mut self, text: &str) {
        let (target, request) = self.conversation.dispatch(text);
        let reply = match serde_json::to_string(&request) {
            Ok(body) => {
                log::info!("dispatching {body} to {}", target.as_ref().map(|w| w.url.as_str()).unwrap_or("local echo"));
                let output = match &target {
                    Some(webhook) => format!("{} received: {text}", webhook.name),
                    None => format!("You said: {text}"),
                };
                decode_response(&serde_json::json!({ "output": output }).to_string())
            }
            Err(e) => {
                log::error!("failed to encode request: {e}");
                DISPATCH_FAILED.to_string()
            }
        };
        self.response.deliver_response(&reply, &mut self.scheduler);
        self.pending_reply = Some(reply);
    }

    fn draw(&self, out: &mut impl io::Write) -> io::Result<()> {
        let palette = self.conversation.palette_matches(self.input.value());
        let screen = Screen {
            session_id: self.conversation.session_id(),
            messages: self.conversation.messages(),
            palette: &palette,
            active_webhook: self.conversation.active_override(),
            response: &self.response,
            input: &self.input,
        };
        terminal::draw(out, &screen)
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let mut stdout = io::stdout();
        loop {
            self.draw(&mut stdout)?;
            let timeout = self.scheduler.time_until_next().unwrap_or(IDLE_POLL).min(IDLE_POLL);
            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.on_key(key) == Flow::Quit {
                            break;
                        }
                    }
                    Event::FocusGained => self.on_visibility(Visibility::Visible),
                    Event::FocusLost => self.on_visibility(Visibility::Hidden),
                    _ => (),
                }
            }
            for wakeup in self.scheduler.poll() {
                self.wake(wakeup);
            }
            self.process_events();
        }
        self.input.dispose(&mut self.scheduler);
        self.response.dispose(&mut self.scheduler);
        Ok(())
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.log_file.as_ref())?;
    let config = load_config(&cli)?;
    if cli.list_fonts {
        for font in available_fonts() {
            println!("{font}");
        }
        return Ok(());
    }
    let mut app = App::new(&config)?;
    let _guard = TerminalGuard::enter().context("setting up terminal")?;
    app.run()
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
