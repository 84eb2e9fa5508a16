use clap::Parser;
use colored::*;
use ssm_session::aws::{self, AwsInventory};
use ssm_session::inventory::{self, InstanceDirectory};
use ssm_session::listing::format_listing;
use ssm_session::resolver::Resolver;
use ssm_session::session::SessionCommand;
use ssm_session::{Level, Logger, SsmError};

#[derive(Parser)]
#[command(name = "ssm-session")]
#[command(about = "Start an SSM session to an EC2 instance by id, Name tag, hostname or IP address")]
#[command(version)]
struct Cli {
    /// Instance id, Name tag, hostname or IP address
    #[arg(
        value_name = "INSTANCE",
        conflicts_with = "list",
        required_unless_present = "list"
    )]
    instance: Option<String>,

    /// Extra arguments passed verbatim to `aws ssm start-session`
    #[arg(
        value_name = "SESSION_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        conflicts_with = "list"
    )]
    session_args: Vec<String>,

    /// List SSM-registered instances and exit
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// AWS profile to use (defaults to AWS_PROFILE env var or default profile)
    #[arg(short = 'p', long = "profile")]
    profile: Option<String>,

    /// AWS region to use (defaults to AWS_REGION env var or config file)
    #[arg(short = 'r', long = "region")]
    region: Option<String>,

    /// Show progress messages
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Show debug messages
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut cli = Cli::parse();
    cli.absorb_known_flags();
    let log = Logger::new(Level::from_flags(cli.verbose, cli.debug));

    let result = run(cli, &log).await;
    std::process::exit(exit_code(result, &log));
}

impl Cli {
    /// Apply our own options that appeared among the pass-through arguments.
    ///
    /// Once the first session argument is seen clap captures the rest
    /// verbatim, so `web --document-name X --region eu-west-1` would
    /// otherwise hand `--region` to the session only. Everything after a
    /// literal `--` is left untouched.
    fn absorb_known_flags(&mut self) {
        let mut remaining = Vec::with_capacity(self.session_args.len());
        let mut args = std::mem::take(&mut self.session_args).into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--" => {
                    remaining.extend(args.by_ref());
                    break;
                }
                "-v" | "--verbose" => self.verbose = true,
                "-d" | "--debug" => self.debug = true,
                "-p" | "--profile" | "-r" | "--region" => match args.next() {
                    Some(value) => self.set_option(&arg, value),
                    None => remaining.push(arg),
                },
                _ => {
                    if let Some(value) = arg.strip_prefix("--profile=") {
                        self.profile = Some(value.to_string());
                    } else if let Some(value) = arg.strip_prefix("--region=") {
                        self.region = Some(value.to_string());
                    } else {
                        remaining.push(arg);
                    }
                }
            }
        }

        self.session_args = remaining;
    }

    fn set_option(&mut self, flag: &str, value: String) {
        if flag == "-p" || flag == "--profile" {
            self.profile = Some(value);
        } else {
            self.region = Some(value);
        }
    }
}

async fn run(cli: Cli, log: &Logger) -> Result<i32, SsmError> {
    log.debug(&format!(
        "Profile: {}",
        cli.profile.as_deref().unwrap_or("default")
    ));
    log.debug(&format!(
        "Region: {}",
        cli.region.as_deref().unwrap_or("default (from config)")
    ));

    let config = aws::load_config(cli.profile.clone(), cli.region.clone()).await;
    aws::validate_credentials(&config, log).await?;

    let source = AwsInventory::new(&config);

    if cli.list {
        let directory = inventory::fetch(&source, log).await?;
        return Ok(print_listing(&directory, log));
    }

    let token = cli.instance.as_deref().unwrap_or_default();
    log.debug(&format!("Instance: {}", token));

    let instance_id = Resolver::new(&source, log).require(token).await?;
    log.success(&format!("Found instance for '{}'", token));
    log.info(&format!("Instance ID: {}", instance_id.green()));

    SessionCommand::new(instance_id)
        .profile(cli.profile)
        .region(cli.region)
        .extra_args(cli.session_args)
        .launch(log)
}

/// Print the table; an empty inventory is a soft failure.
fn print_listing(directory: &InstanceDirectory, log: &Logger) -> i32 {
    let rows = format_listing(directory, log);
    for line in &rows {
        println!("{}", line);
    }

    if rows.is_empty() {
        1
    } else {
        0
    }
}

/// Turn the outcome of a run into the process exit status, reporting errors.
fn exit_code(result: Result<i32, SsmError>, log: &Logger) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            report(&err, log);
            1
        }
    }
}

fn report(err: &SsmError, log: &Logger) {
    match err {
        SsmError::AmbiguousMatch { .. } => {
            log.warning(&err.to_string());
            log.warning("Use INSTANCE_ID to connect to a specific one");
        }
        SsmError::UnresolvedToken { token } => {
            log.warning(&err.to_string());
            log.warning(&format!("Perhaps the '{}' is not registered in SSM?", token));
        }
        _ => log.error(&err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use ssm_session::InstanceRecord;

    fn parse(args: &[&str]) -> Cli {
        let mut cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        cli.absorb_known_flags();
        cli
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_trailing_arguments_pass_through() {
        let cli = Cli::try_parse_from([
            "ssm-session",
            "-p",
            "prod",
            "web",
            "--document-name",
            "AWS-StartInteractiveCommand",
        ])
        .unwrap();

        assert_eq!(cli.instance.as_deref(), Some("web"));
        assert_eq!(cli.profile.as_deref(), Some("prod"));
        assert_eq!(
            cli.session_args,
            vec!["--document-name", "AWS-StartInteractiveCommand"]
        );
    }

    #[test]
    fn test_list_conflicts_with_instance() {
        assert!(Cli::try_parse_from(["ssm-session", "--list", "web"]).is_err());
        assert!(Cli::try_parse_from(["ssm-session"]).is_err());

        let cli = Cli::try_parse_from(["ssm-session", "-l", "-d"]).unwrap();
        assert!(cli.list);
        assert!(cli.debug);
        assert!(cli.instance.is_none());
    }

    #[test]
    fn test_known_flags_after_session_args_are_honoured() {
        let cli = parse(&[
            "ssm-session",
            "web",
            "--document-name",
            "X",
            "--region",
            "eu-west-1",
            "-v",
            "--profile=prod",
        ]);

        assert_eq!(cli.instance.as_deref(), Some("web"));
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cli.profile.as_deref(), Some("prod"));
        assert!(cli.verbose);
        assert_eq!(cli.session_args, vec!["--document-name", "X"]);
    }

    #[test]
    fn test_arguments_after_double_dash_stay_verbatim() {
        let mut cli = parse(&["ssm-session", "web"]);
        cli.session_args = ["--reason", "x", "--", "--region", "us-east-1"]
            .iter()
            .map(|arg| arg.to_string())
            .collect();
        cli.absorb_known_flags();

        assert_eq!(cli.region, None);
        assert_eq!(cli.session_args, vec!["--reason", "x", "--region", "us-east-1"]);
    }

    #[test]
    fn test_dangling_option_is_passed_through() {
        let cli = parse(&["ssm-session", "web", "--reason", "--region"]);

        assert_eq!(cli.region, None);
        assert_eq!(cli.session_args, vec!["--reason", "--region"]);
    }

    #[test]
    fn test_success_keeps_exit_code() {
        let log = Logger::capturing(Level::Debug);
        assert_eq!(exit_code(Ok(0), &log), 0);
        assert_eq!(exit_code(Ok(130), &log), 130);
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_ambiguous_match_exits_with_candidates() {
        let log = Logger::capturing(Level::Warning);
        let err = SsmError::AmbiguousMatch {
            token: "web".to_string(),
            candidates: vec!["i-0aaa".to_string(), "i-0bbb".to_string()],
        };

        assert_eq!(exit_code(Err(err), &log), 1);
        assert_eq!(
            log.lines(),
            vec![
                "[WARNING] Found 2 instances for 'web': i-0aaa i-0bbb",
                "[WARNING] Use INSTANCE_ID to connect to a specific one",
            ]
        );
    }

    #[test]
    fn test_unresolved_token_exits_with_hint() {
        let log = Logger::capturing(Level::Warning);
        let err = SsmError::UnresolvedToken {
            token: "db01".to_string(),
        };

        assert_eq!(exit_code(Err(err), &log), 1);
        assert_eq!(
            log.lines(),
            vec![
                "[WARNING] Could not resolve Instance ID for 'db01'",
                "[WARNING] Perhaps the 'db01' is not registered in SSM?",
            ]
        );
    }

    #[test]
    fn test_remote_error_exits_with_error_line() {
        let log = Logger::capturing(Level::Warning);
        let err = SsmError::RemoteService {
            operation: "GetInventory",
            message: "ExpiredTokenException".to_string(),
        };

        assert_eq!(exit_code(Err(err), &log), 1);
        assert_eq!(log.lines(), vec!["[ERROR] [GetInventory] ExpiredTokenException"]);
    }

    #[test]
    fn test_empty_listing_is_a_soft_failure() {
        let log = Logger::capturing(Level::Warning);
        assert_eq!(print_listing(&InstanceDirectory::new(), &log), 1);
        assert_eq!(log.lines(), vec!["[WARNING] No instances registered in SSM!"]);

        let directory: InstanceDirectory = vec![InstanceRecord::new("i-0aaa", Some("web".to_string()))]
            .into_iter()
            .collect();
        assert_eq!(print_listing(&directory, &Logger::capturing(Level::Warning)), 0);
    }
}
