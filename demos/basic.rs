//! A small site: one page, one action, one script, all from config.
//!
//! Run with:
//!   KILN_LOG=debug cargo run --example basic
//!   cargo run --example basic -- greet --name ada
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl -X POST http://localhost:3000/subscribe -d 'ada@example.test'
//!   curl -H 'accept: application/json' http://localhost:3000/nowhere

use clap::ArgMatches;
use kiln::{
    Action, ActionState, App, Arguments, Catalog, ConfigLoader, Configurable, Method, Request,
    Result, Script, ScriptArgument, ScriptState, Server, Template,
};
use serde_json::Value;

const CONFIG: &str = "demos/basic.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::new().with_config_path(CONFIG).load()?;
    kiln::init_logging(&config.logger)?;

    let catalog = Catalog::new()
        .with::<dyn Template, _>("HomeTemplate", |_: &Arguments| {
            Ok(Box::new(HomeTemplate::default()))
        })
        .with::<dyn Action, _>("SubscribeAction", |_: &Arguments| {
            Ok(Box::new(SubscribeAction::default()))
        })
        .with::<dyn Script, _>("GreetScript", |_: &Arguments| Ok(Box::new(GreetScript::new()?)));

    let app = App::new(config, catalog)?.on(Method::Get, "/healthz", |_: &Request| "ok");

    let mut argv = std::env::args().skip(1);
    if let Some(script) = argv.next() {
        return app.run_script(&script, argv);
    }

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

#[derive(Default)]
struct HomeTemplate {
    headline: String,
}

impl Configurable for HomeTemplate {
    fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        match (key, value.as_str()) {
            ("headline", Some(s)) => {
                self.headline = s.to_owned();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Template for HomeTemplate {
    fn render(&self, engine: &str) -> Result<String> {
        Ok(format!("<h1>{}</h1><!-- {engine} -->", kiln::escape_html(&self.headline)))
    }
}

#[derive(Default)]
struct SubscribeAction {
    state: ActionState,
}

impl Configurable for SubscribeAction {
    fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        self.state.set_field(key, value)
    }
}

impl Action for SubscribeAction {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn run(&mut self, req: &Request) -> Result<()> {
        let valid = std::str::from_utf8(req.body()).is_ok_and(|s| s.contains('@'));
        self.state.set_success(valid);
        Ok(())
    }
}

struct GreetScript {
    state: ScriptState,
}

impl GreetScript {
    fn new() -> Result<Self> {
        let mut state = ScriptState::default();
        state
            .set_description("Greets someone.")
            .add_argument("name", ScriptArgument::option("name to greet"))?;
        Ok(Self { state })
    }
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
        let mut stdin = std::io::stdin().lock();
        let name = self.state.arg_or_input(args, "name", &mut stdin, &mut std::io::stdout())?;
        if !self.state.quiet() {
            println!("Hello, {name}!");
        }
        Ok(())
    }
}
