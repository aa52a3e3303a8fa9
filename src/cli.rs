//! Command-line argument parsing for the `turmas` binary.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;

use turmas::models::ResourceKind;

pub const USAGE: &str = "\
Usage: turmas <command> [args]

Session:
  login [email]            Log in (password is prompted)
  register [--admin]       Create an account and log in
  logout                   Forget the stored session
  whoami                   Show the logged-in user

Learner:
  dashboard                Your classes and their resources
  class <id>               Class details

Admin:
  trainings | classes | learners | resources | overview
  add-training <name> [description]
  add-class <training_id> <name> <start YYYY-MM-DD> [end YYYY-MM-DD]
  enroll <class_id> <learner_id>...
  add-resource <class_id> <kind> <name> [--url U] [--file P] [--description D]
               [--prior-access] [--draft]
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Login { email: Option<String> },
    Register { admin: bool },
    Logout,
    WhoAmI,
    Dashboard,
    Class { id: i64 },
    Trainings,
    Classes,
    Learners,
    Resources,
    Overview,
    AddTraining { name: String, description: Option<String> },
    AddClass { training_id: i64, name: String, start: NaiveDate, end: Option<NaiveDate> },
    Enroll { class_id: i64, learner_ids: Vec<i64> },
    AddResource(ResourceArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceArgs {
    pub class_id: i64,
    pub kind: ResourceKind,
    pub name: String,
    pub url: Option<String>,
    pub file: Option<PathBuf>,
    pub description: Option<String>,
    pub prior_access: bool,
    pub draft: bool,
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.ok_or_else(|| anyhow!("Missing {}", what))?;
    value
        .parse()
        .with_context(|| format!("Invalid {}: {}", what, value))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", value))
}

fn required(value: Option<&String>, what: &str) -> Result<String> {
    value.cloned().ok_or_else(|| anyhow!("Missing {}", what))
}

impl Command {
    /// Parse the arguments following the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Help);
        };
        let rest = &args[1..];

        let command = match name.as_str() {
            "help" | "--help" | "-h" => Command::Help,
            "login" => Command::Login {
                email: rest.first().cloned(),
            },
            "register" => Command::Register {
                admin: rest.iter().any(|a| a == "--admin"),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "dashboard" => Command::Dashboard,
            "class" => Command::Class {
                id: parse_id(rest.first(), "class id")?,
            },
            "trainings" => Command::Trainings,
            "classes" => Command::Classes,
            "learners" => Command::Learners,
            "resources" => Command::Resources,
            "overview" => Command::Overview,
            "add-training" => Command::AddTraining {
                name: required(rest.first(), "training name")?,
                description: rest.get(1).cloned(),
            },
            "add-class" => Command::AddClass {
                training_id: parse_id(rest.first(), "training id")?,
                name: required(rest.get(1), "class name")?,
                start: parse_date(&required(rest.get(2), "start date")?)?,
                end: rest.get(3).map(|d| parse_date(d)).transpose()?,
            },
            "enroll" => {
                let class_id = parse_id(rest.first(), "class id")?;
                let learner_ids = rest[1..]
                    .iter()
                    .map(|id| parse_id(Some(id), "learner id"))
                    .collect::<Result<Vec<_>>>()?;
                if learner_ids.is_empty() {
                    bail!("Missing learner ids");
                }
                Command::Enroll {
                    class_id,
                    learner_ids,
                }
            }
            "add-resource" => Command::AddResource(Self::parse_resource(rest)?),
            other => bail!("Unknown command: {}\n\n{}", other, USAGE),
        };
        Ok(command)
    }

    fn parse_resource(args: &[String]) -> Result<ResourceArgs> {
        let class_id = parse_id(args.first(), "class id")?;
        let kind_name = required(args.get(1), "resource kind")?;
        let kind = ResourceKind::parse(&kind_name).ok_or_else(|| {
            let known: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.as_str()).collect();
            anyhow!("Unknown resource kind '{}' (one of: {})", kind_name, known.join(", "))
        })?;
        let mut resource = ResourceArgs {
            class_id,
            kind,
            name: required(args.get(2), "resource name")?,
            url: None,
            file: None,
            description: None,
            prior_access: false,
            draft: false,
        };

        let mut options = args[3.min(args.len())..].iter();
        while let Some(option) = options.next() {
            match option.as_str() {
                "--url" => resource.url = Some(required(options.next(), "value for --url")?),
                "--file" => {
                    resource.file = Some(PathBuf::from(required(options.next(), "value for --file")?))
                }
                "--description" => {
                    resource.description = Some(required(options.next(), "value for --description")?)
                }
                "--prior-access" => resource.prior_access = true,
                "--draft" => resource.draft = true,
                other => bail!("Unknown option for add-resource: {}", other),
            }
        }
        Ok(resource)
    }

    /// Commands that only administrators may run.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::Trainings
                | Command::Classes
                | Command::Learners
                | Command::Resources
                | Command::Overview
                | Command::AddTraining { .. }
                | Command::AddClass { .. }
                | Command::Enroll { .. }
                | Command::AddResource(_)
        )
    }

    /// Commands that need a logged-in user.
    pub fn requires_login(&self) -> bool {
        !matches!(
            self,
            Command::Help | Command::Login { .. } | Command::Register { .. } | Command::Logout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Help);
        assert_eq!(
            Command::parse(&args("login a@x.com")).unwrap(),
            Command::Login { email: Some("a@x.com".into()) }
        );
        assert_eq!(
            Command::parse(&args("register --admin")).unwrap(),
            Command::Register { admin: true }
        );
        assert!(!Command::Logout.requires_login());
        assert!(Command::Dashboard.requires_login());
    }

    #[test]
    fn test_parse_add_class() {
        let command = Command::parse(&args("add-class 5 Abril 2025-04-01 2025-04-30")).unwrap();
        assert_eq!(
            command,
            Command::AddClass {
                training_id: 5,
                name: "Abril".into(),
                start: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 4, 30),
            }
        );
        assert!(command.requires_admin());
        assert!(Command::parse(&args("add-class 5 Abril 01/04/2025")).is_err());
    }

    #[test]
    fn test_parse_enroll() {
        assert_eq!(
            Command::parse(&args("enroll 3 7 8")).unwrap(),
            Command::Enroll { class_id: 3, learner_ids: vec![7, 8] }
        );
        assert!(Command::parse(&args("enroll 3")).is_err());
        assert!(Command::parse(&args("enroll 3 x")).is_err());
    }

    #[test]
    fn test_parse_add_resource() {
        let command =
            Command::parse(&args("add-resource 4 pdf Apostila --file ./a.pdf --prior-access")).unwrap();
        match command {
            Command::AddResource(resource) => {
                assert_eq!(resource.class_id, 4);
                assert_eq!(resource.kind, ResourceKind::Pdf);
                assert_eq!(resource.file, Some(PathBuf::from("./a.pdf")));
                assert!(resource.prior_access);
                assert!(!resource.draft);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Command::parse(&args("add-resource 4 slides Deck")).is_err());
        assert!(Command::parse(&args("add-resource 4 link Docs --url")).is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(Command::parse(&args("frobnicate")).is_err());
        assert!(!Command::Class { id: 1 }.requires_admin());
    }
}
