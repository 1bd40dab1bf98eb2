//! Script controllers: command-line entry points.
//!
//! A script declares its arguments as data ([`ScriptArgument`]), which can
//! also come from route configuration. [`invoke`] turns the declaration
//! into a `clap` command, parses argv and runs the script.
//!
//! Every script gets `-q/--quiet` and `-v/--verbose`; `--help` comes from
//! clap.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::io::{BufRead, Write};

use clap::builder::PossibleValuesParser;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::container::Container;
use crate::error::{Error, Result};
use crate::factory::Configurable;

/// One declared command-line argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptArgument {
    /// Short flag (`-q`).
    pub prefix: Option<char>,
    /// Long flag (`--quiet`); defaults to the argument name.
    pub long_prefix: Option<String>,
    pub description: String,
    /// A boolean switch rather than a valued option.
    pub no_value: bool,
    pub required: bool,
    pub default_value: Option<String>,
    /// Accepted values, also offered when prompting.
    pub choices: Vec<String>,
}

impl ScriptArgument {
    pub fn flag(prefix: char, description: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix),
            description: description.into(),
            no_value: true,
            ..Self::default()
        }
    }

    pub fn option(description: impl Into<String>) -> Self {
        Self { description: description.into(), ..Self::default() }
    }

    fn to_arg(&self, name: &str) -> Arg {
        let mut arg = Arg::new(name.to_owned())
            .help(self.description.clone())
            .long(self.long_prefix.clone().unwrap_or_else(|| name.to_owned()));
        if let Some(short) = self.prefix {
            arg = arg.short(short);
        }
        if self.no_value {
            return arg.action(ArgAction::SetTrue);
        }
        arg = arg.action(ArgAction::Set).required(self.required);
        if let Some(default) = &self.default_value {
            arg = arg.default_value(default.clone());
        }
        if !self.choices.is_empty() {
            arg = arg.value_parser(PossibleValuesParser::new(self.choices.clone()));
        }
        arg
    }
}

/// Fields shared by every script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptState {
    ident: String,
    description: String,
    arguments: BTreeMap<String, ScriptArgument>,
    quiet: bool,
    verbose: bool,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            ident: String::new(),
            description: String::new(),
            arguments: Self::default_arguments(),
            quiet: false,
            verbose: false,
        }
    }
}

impl ScriptState {
    pub fn new(ident: impl Into<String>) -> Self {
        Self { ident: ident.into(), ..Self::default() }
    }

    pub fn default_arguments() -> BTreeMap<String, ScriptArgument> {
        BTreeMap::from([
            ("quiet".to_owned(), ScriptArgument::flag('q', "Disable output as much as possible.")),
            ("verbose".to_owned(), ScriptArgument::flag('v', "Increase output verbosity.")),
        ])
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn set_ident(&mut self, ident: impl Into<String>) -> &mut Self {
        self.ident = ident.into();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    /// Replaces every argument, keeping the defaults underneath.
    ///
    /// Fails when two arguments share a flag or one claims `-h`/`--help`.
    pub fn set_arguments(
        &mut self,
        arguments: BTreeMap<String, ScriptArgument>,
    ) -> Result<&mut Self> {
        let mut merged = Self::default_arguments();
        merged.extend(arguments);
        check_flags(&merged)?;
        self.arguments = merged;
        Ok(self)
    }

    pub fn add_argument(
        &mut self,
        name: impl Into<String>,
        argument: ScriptArgument,
    ) -> Result<&mut Self> {
        let mut merged = self.arguments.clone();
        merged.insert(name.into(), argument);
        check_flags(&merged)?;
        self.arguments = merged;
        Ok(self)
    }

    pub fn arguments(&self) -> &BTreeMap<String, ScriptArgument> {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&ScriptArgument> {
        self.arguments.get(name)
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// The clap command for the declared arguments. argv carries no binary
    /// name.
    pub fn command(&self) -> Command {
        let name = if self.ident.is_empty() { "script".to_owned() } else { self.ident.clone() };
        let mut command = Command::new(name).no_binary_name(true);
        if !self.description.is_empty() {
            command = command.about(self.description.clone());
        }
        for (name, argument) in &self.arguments {
            command = command.arg(argument.to_arg(name));
        }
        command
    }

    /// Applies `ident`, `description` and `arguments`.
    pub fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "ident" | "description" => {
                let s = value.as_str().ok_or_else(|| {
                    Error::invalid_configuration(format!("`{key}` must be a string"))
                })?;
                if key == "ident" {
                    self.set_ident(s);
                } else {
                    self.set_description(s);
                }
            }
            "arguments" => {
                let arguments: BTreeMap<String, ScriptArgument> =
                    serde_json::from_value(value.clone()).map_err(|e| {
                        Error::invalid_configuration(format!("script arguments: {e}"))
                    })?;
                self.set_arguments(arguments)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// The value of `name` from argv, or else a prompt on `input`.
    ///
    /// When the argument declares choices, the prompt repeats until one of
    /// them is entered.
    pub fn arg_or_input<R, W>(
        &self,
        matches: &ArgMatches,
        name: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<String>
    where
        R: BufRead,
        W: Write,
    {
        if let Ok(Some(value)) = matches.try_get_one::<String>(name) {
            return Ok(value.clone());
        }

        let (label, choices) = match self.arguments.get(name) {
            Some(arg) if !arg.description.is_empty() => {
                (arg.description.as_str(), arg.choices.as_slice())
            }
            Some(arg) => (name, arg.choices.as_slice()),
            None => (name, &[][..]),
        };

        loop {
            if choices.is_empty() {
                write!(output, "Enter {label}: ")?;
            } else {
                write!(output, "Enter {label} [{}]: ", choices.join("/"))?;
            }
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("no input for `{name}`"),
                )));
            }
            let answer = line.trim();
            if choices.is_empty() || choices.iter().any(|c| c == answer) {
                return Ok(answer.to_owned());
            }
            writeln!(output, "`{answer}` is not one of {}", choices.join(", "))?;
        }
    }
}

// clap treats every one of these as a programming error and panics.
fn check_flags(arguments: &BTreeMap<String, ScriptArgument>) -> Result<()> {
    let mut shorts = HashSet::from(['h']);
    let mut longs = HashSet::from(["help".to_owned()]);
    for (name, argument) in arguments {
        let invalid = |problem: String| {
            Error::invalid_configuration(format!("script argument `{name}`: {problem}"))
        };
        if name.is_empty() || name == "help" {
            return Err(invalid("the name is reserved".to_owned()));
        }

        let long = argument.long_prefix.clone().unwrap_or_else(|| name.clone());
        if long.is_empty() || long.starts_with('-') {
            return Err(invalid(format!("invalid long flag `{long}`")));
        }
        if !longs.insert(long.clone()) {
            return Err(invalid(format!("flag `--{long}` is already taken")));
        }

        if let Some(short) = argument.prefix {
            if short == '-' || short.is_whitespace() {
                return Err(invalid(format!("invalid short flag `{short}`")));
            }
            if !shorts.insert(short) {
                return Err(invalid(format!("flag `-{short}` is already taken")));
            }
        }
    }
    Ok(())
}

/// A script controller.
pub trait Script: Configurable + Send {
    /// Second-phase injection, called once by the script factory.
    fn set_dependencies(&mut self, _container: &Container) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> &ScriptState;

    fn state_mut(&mut self) -> &mut ScriptState;

    fn run(&mut self, args: &ArgMatches) -> Result<()>;
}

/// Parses `argv` against the script's declared arguments and runs it.
///
/// `--help` prints usage and returns `Ok(())` without running the script.
pub fn invoke<I, S>(script: &mut dyn Script, argv: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let matches = match script.state().command().try_get_matches_from(argv) {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let flag = |name: &str| {
        matches.try_get_one::<bool>(name).ok().flatten().copied().unwrap_or(false)
    };
    let (quiet, verbose) = (flag("quiet"), flag("verbose"));
    let state = script.state_mut();
    state.quiet = quiet;
    state.verbose = verbose;

    debug!(script = %script.state().ident(), quiet, verbose, "running script");
    script.run(&matches)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::json;

    use super::*;
    use crate::factory::UnknownFields;

    #[derive(Default)]
    struct GreetScript {
        state: ScriptState,
        greeted: Option<String>,
    }

    impl Configurable for GreetScript {
        fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
            self.state.set_field(key, value)
        }
    }

    impl Script for GreetScript {
        fn state(&self) -> &ScriptState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut ScriptState {
            &mut self.state
        }
        fn run(&mut self, args: &ArgMatches) -> Result<()> {
            self.greeted = args.get_one::<String>("name").cloned();
            Ok(())
        }
    }

    fn script() -> GreetScript {
        let mut script = GreetScript::default();
        let Value::Object(data) = json!({
            "ident": "greet",
            "description": "Say hello.",
            "arguments": {
                "name": {"prefix": "n", "description": "who to greet"},
                "tone": {"choices": ["warm", "cold"], "default_value": "warm"}
            }
        }) else {
            unreachable!()
        };
        script.set_data(&data, UnknownFields::Reject).unwrap();
        script
    }

    #[test]
    fn defaults_survive_configured_arguments() {
        let script = script();
        let names: Vec<_> = script.state().arguments().keys().map(String::as_str).collect();
        assert_eq!(names, ["name", "quiet", "tone", "verbose"]);
    }

    #[test]
    fn invoke_parses_flags_and_values() {
        let mut script = script();
        invoke(&mut script, ["-q", "--name", "ada"]).unwrap();
        assert!(script.state().quiet());
        assert!(!script.state().verbose());
        assert_eq!(script.greeted.as_deref(), Some("ada"));
    }

    #[test]
    fn invoke_rejects_unknown_choice() {
        let mut script = script();
        let err = invoke(&mut script, ["--tone", "hot"]).unwrap_err();
        assert!(matches!(err, Error::Arguments(_)));
        assert!(script.greeted.is_none());
    }

    #[test]
    fn configured_arguments_cannot_reuse_flags() {
        let cases = [
            json!({"query": {"prefix": "q"}}),
            json!({"hint": {"prefix": "h"}}),
            json!({"silent": {"long_prefix": "quiet"}}),
            json!({"usage": {"long_prefix": "help"}}),
            json!({"help": {}}),
            json!({"a": {"prefix": "x"}, "b": {"prefix": "x"}}),
            json!({"dash": {"prefix": "-"}}),
        ];
        for arguments in cases {
            let mut state = ScriptState::new("ping");
            let err = state.set_field("arguments", &arguments).unwrap_err();
            assert!(matches!(err, Error::InvalidConfiguration { .. }), "{arguments}");
            assert_eq!(state.arguments(), &ScriptState::default_arguments());
        }
    }

    #[test]
    fn default_flags_can_be_redeclared() {
        let mut state = ScriptState::new("ping");
        let arguments = json!({"quiet": {"prefix": "q", "no_value": true, "description": "Hush."}});
        assert!(state.set_field("arguments", &arguments).unwrap());
        assert_eq!(state.argument("quiet").map(|a| a.description.as_str()), Some("Hush."));
    }

    #[test]
    fn add_argument_rejects_taken_flag() {
        let mut state = ScriptState::new("ping");
        let query = ScriptArgument::flag('v', "Query mode.");
        let err = state.add_argument("query", query).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert!(state.argument("query").is_none());
    }

    #[test]
    fn arg_or_input_prefers_argv() {
        let script = script();
        let matches = script.state().command().try_get_matches_from(["-n", "grace"]).unwrap();
        let mut output = Vec::new();
        let value = script
            .state()
            .arg_or_input(&matches, "name", &mut Cursor::new(""), &mut output)
            .unwrap();
        assert_eq!(value, "grace");
        assert!(output.is_empty());
    }

    #[test]
    fn arg_or_input_prompts_until_valid_choice() {
        let mut state = ScriptState::new("pick");
        let colour = ScriptArgument {
            choices: vec!["red".into(), "blue".into()],
            ..ScriptArgument::option("a colour")
        };
        state.add_argument("colour", colour).unwrap();
        let matches = state.command().try_get_matches_from(Vec::<String>::new()).unwrap();

        let mut input = Cursor::new("green\nblue\n");
        let mut output = Vec::new();
        let value = state.arg_or_input(&matches, "colour", &mut input, &mut output).unwrap();

        assert_eq!(value, "blue");
        let prompt = String::from_utf8(output).unwrap();
        assert!(prompt.contains("Enter a colour [red/blue]: "));
        assert!(prompt.contains("`green` is not one of red, blue"));
    }

    #[test]
    fn arg_or_input_fails_on_eof() {
        let state = ScriptState::new("pick");
        let matches = state.command().try_get_matches_from(Vec::<String>::new()).unwrap();
        let err = state
            .arg_or_input(&matches, "missing", &mut Cursor::new(""), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
