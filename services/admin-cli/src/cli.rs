//! Argument parsing

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

use crate::error::Error;

/// Command-line client for the admin dashboard API
#[derive(Parser, Debug)]
#[command(name = "admin-cli")]
#[command(version)]
#[command(about = "Command-line client for the admin dashboard API")]
pub struct Cli {
    /// Config file (default: CONFIG_PATH, then ./admin-cli.toml)
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_path: Option<String>,

    /// Print Prometheus metrics on stderr when the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in; the password comes from ADMIN_PASSWORD or stdin
    Login {
        #[arg(value_name = "EMAIL")]
        email: String,
    },

    /// Create an account and sign in
    Register {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "EMAIL")]
        email: String,
    },

    /// Sign out on the backend and clear the local session
    Logout,

    /// Show the signed-in user
    Me,

    /// Send one API request and print the JSON response
    Request {
        /// HTTP method, any case
        #[arg(value_name = "METHOD", value_parser = parse_method)]
        method: Method,

        /// Path relative to the base URL, or an absolute URL
        #[arg(value_name = "PATH")]
        path: String,

        /// JSON request body
        #[arg(long, value_name = "JSON", value_parser = parse_json)]
        body: Option<Value>,

        /// Query parameter; repeat for more
        #[arg(long, value_name = "KEY=VALUE", value_parser = parse_query_pair)]
        query: Vec<(String, Value)>,

        /// Send without a bearer token and never refresh
        #[arg(long)]
        no_auth: bool,
    },
}

impl Command {
    /// Whether the command needs a password (from ADMIN_PASSWORD or stdin).
    pub fn needs_password(&self) -> bool {
        matches!(self, Command::Login { .. } | Command::Register { .. })
    }
}

fn parse_method(raw: &str) -> Result<Method, Error> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidMethod(raw.to_owned()))
}

fn parse_json(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}

fn parse_query_pair(raw: &str) -> Result<(String, Value), Error> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| Error::InvalidQuery(raw.to_owned()))?;
    Ok((key.to_owned(), Value::String(value.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use serde_json::json;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("admin-cli").chain(args.iter().copied()))
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse(&["me"]).unwrap().command, Command::Me);
        assert_eq!(parse(&["logout"]).unwrap().command, Command::Logout);
        assert_eq!(
            parse(&["login", "mona@example.com"]).unwrap().command,
            Command::Login {
                email: "mona@example.com".into()
            }
        );
        assert_eq!(
            parse(&["register", "Mona", "mona@example.com"])
                .unwrap()
                .command,
            Command::Register {
                name: "Mona".into(),
                email: "mona@example.com".into()
            }
        );
    }

    #[test]
    fn global_flags_anywhere() {
        let cli = parse(&["--metrics", "me", "--config", "/etc/admin.toml"]).unwrap();
        assert!(cli.metrics);
        assert_eq!(cli.config_path.as_deref(), Some("/etc/admin.toml"));
        assert_eq!(cli.command, Command::Me);
    }

    #[test]
    fn parses_request_with_flags() {
        let cli = parse(&[
            "request",
            "post",
            "/categories",
            "--body",
            r#"{"name":"Shoes"}"#,
            "--query",
            "page=2",
            "--query",
            "status=all",
            "--no-auth",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Request {
                method: Method::POST,
                path: "/categories".into(),
                body: Some(json!({"name": "Shoes"})),
                query: vec![
                    ("page".into(), json!("2")),
                    ("status".into(), json!("all")),
                ],
                no_auth: true,
            }
        );
    }

    #[test]
    fn query_value_may_contain_equals() {
        let cli = parse(&["request", "GET", "/x", "--query", "q=a=b"]).unwrap();
        let Command::Request { query, .. } = cli.command else {
            panic!("expected request");
        };
        assert_eq!(query, vec![("q".to_string(), json!("a=b"))]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert_eq!(
            parse(&["login"]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
        assert!(parse(&["me", "--config"]).is_err());
        assert_eq!(
            parse(&["request", "GE T", "/x"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["request", "POST", "/x", "--body", "{nope"])
                .unwrap_err()
                .kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["request", "GET", "/x", "--query", "page"])
                .unwrap_err()
                .kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["request", "GET", "/x", "--verbose"]).unwrap_err().kind(),
            ErrorKind::UnknownArgument
        );
    }

    #[test]
    fn value_parsers_report_the_offending_input() {
        assert_eq!(
            parse_method("GE T").unwrap_err(),
            Error::InvalidMethod("GE T".into())
        );
        assert_eq!(
            parse_query_pair("=x").unwrap_err(),
            Error::InvalidQuery("=x".into())
        );
        assert_eq!(parse_method("patch").unwrap(), Method::PATCH);
    }

    #[test]
    fn password_commands() {
        assert!(Command::Login { email: "e".into() }.needs_password());
        assert!(!Command::Me.needs_password());
    }
}
