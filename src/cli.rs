use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "concierge",
    about = "Terminal chat client for the hotel assistant",
    long_about = "Concierge talks to the hotel assistant backend. Conversations are stored server-side as sessions; replies are revealed progressively as they arrive.",
    version
)]
pub struct Cli {
    /// Backend base URL (overrides the config files)
    #[arg(long, env = "CONCIERGE_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "CONCIERGE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Message to send (if not provided, starts interactive REPL)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Pick a previous session before starting
    #[arg(short, long)]
    pub resume: bool,

    /// Open the session with this id
    #[arg(long, conflicts_with = "resume")]
    pub session: Option<u64>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn get_token(&self) -> Result<String, String> {
        self.token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                "CONCIERGE_TOKEN not found. Please set it as an environment variable or use --token"
                    .to_string()
            })
    }
}
