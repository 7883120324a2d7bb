use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "kion")]
#[command(version, about = "Kion credential broker: temporary AWS credentials and console access")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Settings accepted by every command. These win over config files and
/// `KION_*` variables.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file to use instead of ~/.config/kion/config.toml and ./kion.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kion host, e.g. kion.example.com
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Identity management system (IDMS) id
    #[arg(long, global = true)]
    pub idms: Option<u32>,

    /// Kion username
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Validity window of app API keys, e.g. 168h
    #[arg(long, global = true, value_name = "DURATION")]
    pub app_api_key_duration: Option<String>,

    /// Rotate the app API key automatically when it nears expiry
    #[arg(long, global = true)]
    pub rotate_app_api_keys: bool,

    /// API origin override, e.g. http://127.0.0.1:8080
    #[arg(long, global = true, hide = true)]
    pub api_origin: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive first-time setup
    Setup,

    /// Store your password in the system keyring
    Login,

    /// Remove your password from the system keyring
    Logout,

    /// App API key management
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Print temporary credentials
    #[command(visible_alias = "creds")]
    Credentials(CredentialsArgs),

    /// Credential process for the AWS CLI (`credential_process` in ~/.aws/config)
    CredentialProcess(TargetArgs),

    /// Open the AWS console
    Console(ConsoleArgs),

    /// Print account numbers and the cloud access roles you can assume in them
    Roles,

    /// Print accounts you can see
    Accounts,

    /// Print roles with their account numbers and names
    Access(AccessArgs),

    /// Run a command under each account/role pair read from stdin
    Each(EachArgs),
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Create an app API key
    Create {
        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },
    /// Rotate the app API key
    Rotate,
}

/// Which account and role to get credentials for.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// AWS account number
    #[arg(long)]
    pub account_id: Option<String>,

    /// Cloud access role name
    #[arg(long)]
    pub cloud_access_role: Option<String>,

    /// How long issued credentials are trusted, e.g. 1h
    #[arg(long, value_name = "DURATION")]
    pub session_duration: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CredentialsFormat {
    /// aws_access_key_id = ... lines for ~/.aws/credentials
    #[default]
    Aws,
    /// export AWS_...= lines for a shell
    Export,
    /// JSON object
    Json,
}

#[derive(Args, Debug)]
pub struct CredentialsArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CredentialsFormat::Aws)]
    pub format: CredentialsFormat,
}

#[derive(Args, Debug)]
pub struct ConsoleArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the sign-in URL instead of opening a browser
    #[arg(short, long)]
    pub print: bool,

    /// Sign out of an existing AWS console session first
    #[arg(long, conflicts_with = "print")]
    pub logout: bool,

    /// AWS region for the console
    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct AccessArgs {
    /// Filter by account name
    #[arg(long)]
    pub account: Option<String>,

    /// Filter by account number
    #[arg(long)]
    pub account_id: Option<String>,

    /// Filter by cloud access role
    #[arg(short = 'r', long)]
    pub cloud_access_role: Option<String>,
}

#[derive(Args, Debug)]
pub struct EachArgs {
    /// Command to run; passed to the shell with -c
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    pub command: Vec<String>,

    /// Shell with which to execute the command
    #[arg(long, default_value = "/bin/sh")]
    pub shell: PathBuf,
}

impl GlobalArgs {
    /// Overlay command-line values on a loaded config.
    pub fn apply(&self, config: &mut Config) {
        config.merge(Config {
            host: self.host.clone(),
            idms: self.idms,
            username: self.username.clone(),
            app_api_key_duration: self.app_api_key_duration.clone(),
            rotate_app_api_keys: self.rotate_app_api_keys.then_some(true),
            api_origin: self.api_origin.clone(),
            ..Config::default()
        });
    }
}

impl Commands {
    /// Overlay the per-command target and region flags on a loaded config.
    pub fn apply(&self, config: &mut Config) {
        match self {
            Commands::Credentials(args) => args.target.apply(config),
            Commands::CredentialProcess(target) => target.apply(config),
            Commands::Console(args) => {
                args.target.apply(config);
                config.merge(Config {
                    region: args.region.clone(),
                    ..Config::default()
                });
            }
            _ => {}
        }
    }
}

impl TargetArgs {
    pub fn apply(&self, config: &mut Config) {
        config.merge(Config {
            account_id: self.account_id.clone(),
            cloud_access_role: self.cloud_access_role.clone(),
            session_duration: self.session_duration.clone(),
            ..Config::default()
        });
    }
}
