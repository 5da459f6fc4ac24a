//! Thin CLI layer: parse args, styled output, and call into socket-core.
//! Crash-proof: panic caught and reported; exit codes: 0 ok, 1 failure, 2 usage.

use clap::{Arg, ArgAction, Command};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};
use socket_core::{output, CResult, CliContext, HttpClient, OutputKind, UpdateStore};

// ---- UI helpers (no-op when stdout isn't a TTY) ----

fn use_color() -> bool {
    std::io::stdout().is_terminal()
        && std::env::var("NO_COLOR").unwrap_or_default().is_empty()
}

fn success(msg: &str) {
    if use_color() {
        println!("{}", msg.green());
    } else {
        println!("{}", msg);
    }
}

fn error(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.red());
    } else {
        eprintln!("{}", msg);
    }
}

fn warning(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.yellow());
    } else {
        eprintln!("{}", msg);
    }
}

fn info(msg: &str) {
    if use_color() {
        println!("{}", msg.cyan());
    } else {
        println!("{}", msg);
    }
}

fn dim(msg: &str) {
    if use_color() {
        println!("{}", msg.dimmed());
    } else {
        println!("{}", msg);
    }
}

/// Show a spinner around a network call when attached to a terminal.
fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    if !std::io::stdout().is_terminal() {
        return f();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⠈⠐⠠⠰⠸⠹")
            .template("{spinner:.dim} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = f();
    spinner.finish_and_clear();
    out
}

// ---- Output plumbing ----

/// Usage error: print the failed checks, exit 2.
fn usage_error(problems: Vec<String>) -> i32 {
    error(&output::input_error_banner(&problems));
    2
}

fn output_kind(sub_m: &clap::ArgMatches) -> Result<OutputKind, i32> {
    OutputKind::from_flags(sub_m.get_flag("json"), sub_m.get_flag("markdown"))
        .map_err(|e| usage_error(vec![e]))
}

/// Render a CResult per output kind. The text renderer receives the data on
/// success; failures get the Fail banner. Returns the process exit code.
fn emit(result: CResult<Value>, kind: OutputKind, text: impl FnOnce(&Value)) -> i32 {
    match kind {
        OutputKind::Json => println!("{}", output::render_json(&result)),
        OutputKind::Markdown | OutputKind::Text => match &result {
            CResult::Ok { data } => {
                if kind == OutputKind::Markdown {
                    markdown_fallback(data);
                } else {
                    text(data);
                }
            }
            CResult::Err { message, cause, .. } => {
                error(&output::fail_banner(message, cause.as_deref()));
            }
        },
    }
    result.exit_code()
}

/// Markdown mode without a command-specific table: fenced JSON.
fn markdown_fallback(data: &Value) {
    println!("```json");
    println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
    println!("```");
}

fn emit_table(
    result: CResult<Vec<Value>>,
    kind: OutputKind,
    headers: &[&str],
    fields: &[&str],
) -> i32 {
    let as_value = result.map(Value::Array);
    match kind {
        OutputKind::Json => println!("{}", output::render_json(&as_value)),
        OutputKind::Markdown | OutputKind::Text => match &as_value {
            CResult::Ok { data } => {
                let items = data.as_array().cloned().unwrap_or_default();
                if items.is_empty() {
                    dim("No results.");
                } else {
                    let rows = output::rows_from_values(&items, fields);
                    print!("{}", output::markdown_table(headers, &rows));
                }
            }
            CResult::Err { message, cause, .. } => {
                error(&output::fail_banner(message, cause.as_deref()));
            }
        },
    }
    as_value.exit_code()
}

// ---- Update notifier ----

fn maybe_notify_update(ctx: &mut CliContext) {
    if ctx.env.no_update_notifier || !std::io::stdout().is_terminal() {
        return;
    }
    let Ok(http) = HttpClient::new(ctx.api_proxy().as_deref()) else {
        return;
    };
    let store = UpdateStore::open();
    if let Some(latest) =
        socket_core::check_for_update(&store, &http, "socket", env!("CARGO_PKG_VERSION"))
    {
        warning(&format!(
            "A newer version of socket is available: {} (current: {}).",
            latest,
            env!("CARGO_PKG_VERSION")
        ));
    }
}

// ---- Org resolution ----

/// Configured org, or the token's first org from the API.
fn resolve_org(ctx: &mut CliContext, api: &socket_core::ApiClient) -> Result<String, String> {
    if let Some(org) = ctx.org_slug() {
        return Ok(org);
    }
    let orgs = api.organizations().into_result()?;
    socket_core::first_org_slug(&orgs)
        .ok_or_else(|| "No organization found for this API token.".to_string())
}

fn run() -> Result<i32, String> {
    let json_arg = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output machine-readable JSON result");
    let markdown_arg = Arg::new("markdown")
        .long("markdown")
        .action(ArgAction::SetTrue)
        .help("Output markdown");
    let dry_run_arg = Arg::new("dry-run")
        .long("dry-run")
        .alias("dryRun")
        .action(ArgAction::SetTrue)
        .help("Validate input and exit without calling the API");

    let matches = Command::new("socket")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Supply-chain security from the command line — scans, analytics, and shadowed npm/npx/pnpm")
        .after_help(
            "Examples:\n  socket scan create\n  socket package score lodash\n  socket npm install left-pad\n  socket config set defaultOrg my-org",
        )
        .arg(
            Arg::new("config-override")
                .long("config")
                .global(true)
                .help("Config override (base64 or raw JSON); disables persistence"),
        )
        .subcommand(
            Command::new("config")
                .about("Read and write local CLI settings")
                .subcommand(
                    Command::new("get")
                        .about("Print one config value")
                        .arg(Arg::new("key").required(true).help("Config key"))
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("set")
                        .about("Set one config value")
                        .arg(Arg::new("key").required(true).help("Config key"))
                        .arg(Arg::new("value").required(true).help("New value"))
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("unset")
                        .about("Remove one config value")
                        .arg(Arg::new("key").required(true).help("Config key"))
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("list")
                        .about("Print all known config keys and values")
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("auto")
                        .about("Discover a sensible value for a key (defaultOrg)")
                        .arg(Arg::new("key").required(true).help("Config key"))
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                ),
        )
        .subcommand(
            Command::new("scan")
                .about("Create and inspect full scans")
                .subcommand(
                    Command::new("create")
                        .about("Scan the project in the current (or given) directory")
                        .arg(Arg::new("path").required(false).help("Project directory (default: cwd)"))
                        .arg(
                            Arg::new("repo")
                                .long("repo")
                                .help("Repository slug to associate the scan with"),
                        )
                        .arg(
                            Arg::new("branch")
                                .long("branch")
                                .help("Branch name to associate the scan with"),
                        )
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("list")
                        .about("List scans for the organization")
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("view")
                        .about("Show one scan")
                        .arg(Arg::new("id").required(true).help("Scan id"))
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                ),
        )
        .subcommand(
            Command::new("repository")
                .about("Manage repositories in the organization")
                .subcommand(
                    Command::new("create")
                        .about("Register a repository")
                        .arg(Arg::new("name").required(true).help("Repository name"))
                        .arg(
                            Arg::new("homepage")
                                .long("homepage")
                                .help("Repository homepage URL"),
                        )
                        .arg(
                            Arg::new("visibility")
                                .long("visibility")
                                .value_parser(["public", "private"])
                                .default_value("private")
                                .help("Repository visibility"),
                        )
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("list")
                        .about("List repositories")
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                ),
        )
        .subcommand(
            Command::new("organization")
                .about("Organizations this API token can see")
                .subcommand(
                    Command::new("list")
                        .about("List organizations")
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                ),
        )
        .subcommand(
            Command::new("package")
                .about("Package security reports")
                .subcommand(
                    Command::new("score")
                        .about("Security score for one npm package version")
                        .arg(Arg::new("name").required(true).help("Package name"))
                        .arg(Arg::new("version").required(false).help("Version (default: latest)"))
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                )
                .subcommand(
                    Command::new("shallow")
                        .about("Alert list for package versions (no history)")
                        .arg(
                            Arg::new("spec")
                                .required(true)
                                .num_args(1..)
                                .help("Package spec(s), e.g. lodash@4.17.21"),
                        )
                        .arg(json_arg.clone())
                        .arg(markdown_arg.clone())
                        .arg(dry_run_arg.clone()),
                ),
        )
        .subcommand(
            Command::new("analytics")
                .about("Alert analytics for the organization or one repository")
                .arg(
                    Arg::new("scope")
                        .long("scope")
                        .value_parser(["org", "repo"])
                        .default_value("org")
                        .help("Aggregate over the org or a single repo"),
                )
                .arg(Arg::new("repo").long("repo").help("Repository (scope repo)"))
                .arg(
                    Arg::new("time")
                        .long("time")
                        .value_parser(["7", "30", "90"])
                        .default_value("30")
                        .help("Window in days"),
                )
                .arg(json_arg.clone())
                .arg(markdown_arg.clone())
                .arg(dry_run_arg.clone()),
        )
        .subcommand(
            Command::new("whoami")
                .about("Show the organizations behind the configured token")
                .arg(json_arg.clone())
                .arg(markdown_arg.clone())
                .arg(dry_run_arg.clone()),
        )
        .subcommand(
            Command::new("npm")
                .about("Run npm with Socket interception")
                .arg(
                    Arg::new("args")
                        .num_args(0..)
                        .allow_hyphen_values(true)
                        .trailing_var_arg(true)
                        .help("Arguments for npm"),
                ),
        )
        .subcommand(
            Command::new("npx")
                .about("Run npx with Socket interception")
                .arg(
                    Arg::new("args")
                        .num_args(0..)
                        .allow_hyphen_values(true)
                        .trailing_var_arg(true)
                        .help("Arguments for npx"),
                ),
        )
        .subcommand(
            Command::new("pnpm")
                .about("Run pnpm with a pre-install security check")
                .arg(
                    Arg::new("args")
                        .num_args(0..)
                        .allow_hyphen_values(true)
                        .trailing_var_arg(true)
                        .help("Arguments for pnpm"),
                ),
        )
        .get_matches();

    let config_flag = matches
        .get_one::<String>("config-override")
        .map(|s| s.as_str());
    let mut ctx = CliContext::new(config_flag)?;

    // Shadow commands: no update chatter, straight to the wrapper.
    if let Some((name, sub_m)) = matches.subcommand() {
        if matches!(name, "npm" | "npx" | "pnpm") {
            let args: Vec<String> = sub_m
                .get_many::<String>("args")
                .map(|it| it.cloned().collect())
                .unwrap_or_default();
            let token = ctx.api_token();
            let code = match name {
                "pnpm" => {
                    let api = ctx.api_client_if_configured();
                    socket_core::shadow::pnpm::run(&args, &ctx.env, api.as_ref(), token)?
                }
                _ => {
                    let bin = if name == "npm" {
                        socket_core::shadow::npm::NpmBin::Npm
                    } else {
                        socket_core::shadow::npm::NpmBin::Npx
                    };
                    socket_core::shadow::npm::run(bin, &args, &ctx.env, token)?
                }
            };
            return Ok(code);
        }
    }

    maybe_notify_update(&mut ctx);

    let code = match matches.subcommand() {
        Some(("config", sub)) => run_config(&mut ctx, sub)?,
        Some(("scan", sub)) => run_scan(&mut ctx, sub)?,
        Some(("repository", sub)) => run_repository(&mut ctx, sub)?,
        Some(("organization", sub)) => run_organization(&mut ctx, sub)?,
        Some(("package", sub)) => run_package(&mut ctx, sub)?,
        Some(("analytics", sub)) => run_analytics(&mut ctx, sub)?,
        Some(("whoami", sub)) => run_whoami(&mut ctx, sub)?,
        _ => {
            if use_color() {
                println!("{}", "socket".bright_cyan().bold());
                dim("Supply-chain security from the command line.");
            } else {
                println!("socket — supply-chain security from the command line");
            }
            dim("\nRun `socket --help` for details.");
            0
        }
    };

    if let Err(e) = ctx.flush_config() {
        warning(&format!("Could not persist config: {}", e));
    }
    Ok(code)
}

// ---- config ----

fn run_config(ctx: &mut CliContext, matches: &clap::ArgMatches) -> Result<i32, String> {
    let Some((name, sub_m)) = matches.subcommand() else {
        dim("Use `socket config get|set|unset|list|auto`.");
        return Ok(0);
    };
    let kind = match output_kind(sub_m) {
        Ok(kind) => kind,
        Err(code) => return Ok(code),
    };
    let dry_run = sub_m.get_flag("dry-run");

    // All config subcommands validate the key up front.
    let key = sub_m.try_get_one::<String>("key").ok().flatten().cloned();
    if let Some(ref key) = key {
        if !socket_core::config::is_known_key(key) {
            return Ok(usage_error(vec![format!(
                "unknown config key: {} (known: {})",
                key,
                socket_core::KNOWN_KEYS.join(", ")
            )]));
        }
        if name == "auto" && key != "defaultOrg" {
            return Ok(usage_error(vec![format!(
                "config auto only supports defaultOrg, got {}",
                key
            )]));
        }
    }
    if dry_run {
        dim("Dry run: input OK.");
        return Ok(0);
    }

    match name {
        "get" => {
            let key = key.unwrap();
            let value = ctx.config.get(&key);
            let result = CResult::ok(json!({ "key": key, "value": value }));
            Ok(emit(result, kind, |data| match &data["value"] {
                Value::Null => dim(&format!("{} is not set", data["key"].as_str().unwrap_or(""))),
                value => println!(
                    "{}: {}",
                    data["key"].as_str().unwrap_or(""),
                    display_value(value)
                ),
            }))
        }
        "set" => {
            let key = key.unwrap();
            let value = sub_m.get_one::<String>("value").unwrap();
            ctx.config.set(&key, json!(value))?;
            let persisted = !ctx.config.is_read_only();
            let result = CResult::ok(json!({ "key": key, "value": value, "persisted": persisted }));
            Ok(emit(result, kind, |data| {
                success(&format!("Set {}.", data["key"].as_str().unwrap_or("")));
            }))
        }
        "unset" => {
            let key = key.unwrap();
            ctx.config.unset(&key)?;
            let result = CResult::ok(json!({ "key": key }));
            Ok(emit(result, kind, |data| {
                success(&format!("Unset {}.", data["key"].as_str().unwrap_or("")));
            }))
        }
        "list" => {
            let entries = ctx.config.list();
            let data: Vec<Value> = entries
                .iter()
                .map(|(key, value)| {
                    let shown = match (key.as_str(), value) {
                        // Never print the token itself.
                        ("apiToken", Some(_)) => json!("<redacted>"),
                        (_, Some(v)) => v.clone(),
                        (_, None) => Value::Null,
                    };
                    json!({ "key": key, "value": shown })
                })
                .collect();
            Ok(emit_table(
                CResult::ok(data),
                kind,
                &["Key", "Value"],
                &["key", "value"],
            ))
        }
        "auto" => {
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let result = match api.organizations().into_result() {
                Ok(orgs) => match socket_core::first_org_slug(&orgs) {
                    Some(slug) => {
                        ctx.config.set("defaultOrg", json!(slug))?;
                        CResult::ok(json!({ "key": "defaultOrg", "value": slug }))
                    }
                    None => CResult::fail("No organization found for this API token."),
                },
                Err(e) => CResult::fail(e),
            };
            Ok(emit(result, kind, |data| {
                success(&format!(
                    "Set defaultOrg to {}.",
                    data["value"].as_str().unwrap_or("")
                ));
            }))
        }
        _ => {
            dim("Use `socket config get|set|unset|list|auto`.");
            Ok(0)
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---- scan ----

fn run_scan(ctx: &mut CliContext, matches: &clap::ArgMatches) -> Result<i32, String> {
    let Some((name, sub_m)) = matches.subcommand() else {
        dim("Use `socket scan create|list|view`.");
        return Ok(0);
    };
    let kind = match output_kind(sub_m) {
        Ok(kind) => kind,
        Err(code) => return Ok(code),
    };
    let dry_run = sub_m.get_flag("dry-run");

    match name {
        "create" => {
            let dir = sub_m
                .get_one::<String>("path")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
            if !dir.join("package.json").is_file() {
                return Ok(usage_error(vec![format!(
                    "no package.json found in {}",
                    dir.display()
                )]));
            }
            if dry_run {
                dim("Dry run: input OK.");
                return Ok(0);
            }
            let purls = socket_core::manifest::project_purls(&dir)?;
            if purls.is_empty() {
                return Ok(usage_error(vec![
                    "no pinned dependencies found; generate a lockfile first".to_string(),
                ]));
            }
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let org = resolve_org(ctx, &api)?;
            let mut options = json!({});
            if let Some(repo) = sub_m.get_one::<String>("repo") {
                options["repo"] = json!(repo);
            }
            if let Some(branch) = sub_m.get_one::<String>("branch") {
                options["branch"] = json!(branch);
            }
            let result = with_spinner("Creating scan…", || {
                api.scan_create(&org, &purls, &options)
            });
            Ok(emit(result, kind, |data| {
                success("Scan created.");
                if let Some(id) = data.get("id").and_then(|i| i.as_str()) {
                    info(&format!("Scan id: {}", id));
                }
            }))
        }
        "list" => {
            if dry_run {
                dim("Dry run: input OK.");
                return Ok(0);
            }
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let org = resolve_org(ctx, &api)?;
            let result = api.scan_list(&org);
            Ok(emit_table(
                result,
                kind,
                &["Id", "Branch", "Created"],
                &["id", "branch", "created_at"],
            ))
        }
        "view" => {
            let id = sub_m.get_one::<String>("id").unwrap();
            if id.trim().is_empty() {
                return Ok(usage_error(vec!["scan id must not be empty".to_string()]));
            }
            if dry_run {
                dim("Dry run: input OK.");
                return Ok(0);
            }
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let org = resolve_org(ctx, &api)?;
            let result = api.scan_view(&org, id);
            Ok(emit(result, kind, |data| {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_default()
                );
            }))
        }
        _ => {
            dim("Use `socket scan create|list|view`.");
            Ok(0)
        }
    }
}

// ---- repository ----

fn run_repository(ctx: &mut CliContext, matches: &clap::ArgMatches) -> Result<i32, String> {
    let Some((name, sub_m)) = matches.subcommand() else {
        dim("Use `socket repository create|list`.");
        return Ok(0);
    };
    let kind = match output_kind(sub_m) {
        Ok(kind) => kind,
        Err(code) => return Ok(code),
    };
    let dry_run = sub_m.get_flag("dry-run");

    match name {
        "create" => {
            let repo_name = sub_m.get_one::<String>("name").unwrap();
            if repo_name.trim().is_empty()
                || !repo_name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
            {
                return Ok(usage_error(vec![format!(
                    "invalid repository name: {:?}",
                    repo_name
                )]));
            }
            if dry_run {
                dim("Dry run: input OK.");
                return Ok(0);
            }
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let org = resolve_org(ctx, &api)?;
            let mut options = json!({
                "visibility": sub_m.get_one::<String>("visibility").unwrap(),
            });
            if let Some(homepage) = sub_m.get_one::<String>("homepage") {
                options["homepage"] = json!(homepage);
            }
            let result = api.repository_create(&org, repo_name, &options);
            Ok(emit(result, kind, |data| {
                success(&format!(
                    "Repository {} created.",
                    data.get("name").and_then(|n| n.as_str()).unwrap_or("")
                ));
            }))
        }
        "list" => {
            if dry_run {
                dim("Dry run: input OK.");
                return Ok(0);
            }
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let org = resolve_org(ctx, &api)?;
            let result = api.repository_list(&org);
            Ok(emit_table(
                result,
                kind,
                &["Name", "Visibility", "Archived"],
                &["name", "visibility", "archived"],
            ))
        }
        _ => {
            dim("Use `socket repository create|list`.");
            Ok(0)
        }
    }
}

// ---- organization / whoami ----

fn run_organization(ctx: &mut CliContext, matches: &clap::ArgMatches) -> Result<i32, String> {
    let Some(("list", sub_m)) = matches.subcommand() else {
        dim("Use `socket organization list`.");
        return Ok(0);
    };
    let kind = match output_kind(sub_m) {
        Ok(kind) => kind,
        Err(code) => return Ok(code),
    };
    if sub_m.get_flag("dry-run") {
        dim("Dry run: input OK.");
        return Ok(0);
    }
    let api = match ctx.api_client() {
        Ok(api) => api,
        Err(e) => {
            error(&e);
            return Ok(1);
        }
    };
    let result = api.organizations();
    Ok(emit(result, kind, |data| {
        let orgs = data
            .get("organizations")
            .and_then(|o| o.as_object())
            .cloned()
            .unwrap_or_default();
        if orgs.is_empty() {
            dim("No organizations.");
            return;
        }
        for org in orgs.values() {
            let slug = org.get("slug").and_then(|s| s.as_str()).unwrap_or("?");
            let plan = org.get("plan").and_then(|p| p.as_str()).unwrap_or("");
            if plan.is_empty() {
                println!("  {}", slug);
            } else {
                println!("  {} ({})", slug, plan);
            }
        }
    }))
}

fn run_whoami(ctx: &mut CliContext, sub_m: &clap::ArgMatches) -> Result<i32, String> {
    let kind = match output_kind(sub_m) {
        Ok(kind) => kind,
        Err(code) => return Ok(code),
    };
    if sub_m.get_flag("dry-run") {
        dim("Dry run: input OK.");
        return Ok(0);
    }
    let api = match ctx.api_client() {
        Ok(api) => api,
        Err(e) => {
            error(&e);
            return Ok(1);
        }
    };
    let result = api.organizations().map(|orgs| {
        let slugs: Vec<String> = orgs
            .get("organizations")
            .and_then(|o| o.as_object())
            .map(|o| {
                o.values()
                    .filter_map(|org| org.get("slug").and_then(|s| s.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        json!({ "organizations": slugs })
    });
    Ok(emit(result, kind, |data| {
        let slugs = data
            .get("organizations")
            .and_then(|s| s.as_array())
            .cloned()
            .unwrap_or_default();
        if slugs.is_empty() {
            dim("Token is valid but belongs to no organization.");
        } else {
            for slug in slugs {
                println!("  {}", slug.as_str().unwrap_or("?"));
            }
        }
    }))
}

// ---- package ----

fn run_package(ctx: &mut CliContext, matches: &clap::ArgMatches) -> Result<i32, String> {
    let Some((name, sub_m)) = matches.subcommand() else {
        dim("Use `socket package score|shallow`.");
        return Ok(0);
    };
    let kind = match output_kind(sub_m) {
        Ok(kind) => kind,
        Err(code) => return Ok(code),
    };
    let dry_run = sub_m.get_flag("dry-run");

    match name {
        "score" => {
            let pkg = sub_m.get_one::<String>("name").unwrap().clone();
            if pkg.trim().is_empty() {
                return Ok(usage_error(vec!["package name must not be empty".to_string()]));
            }
            if dry_run {
                dim("Dry run: input OK.");
                return Ok(0);
            }
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let version = match sub_m.get_one::<String>("version") {
                Some(v) => v.clone(),
                None => socket_core::registry::latest_version(api.http(), &pkg)
                    .map_err(|e| format!("could not resolve latest version of {}: {}", pkg, e))?,
            };
            let result = api.package_score(&pkg, &version);
            Ok(emit(result, kind, |data| {
                info(&format!("{}@{}", pkg, version));
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_default()
                );
            }))
        }
        "shallow" => {
            let specs: Vec<String> = sub_m
                .get_many::<String>("spec")
                .map(|it| it.cloned().collect())
                .unwrap_or_default();
            let parsed: Vec<_> = specs
                .iter()
                .filter_map(|s| socket_core::purl::PackageSpec::parse(s))
                .collect();
            if parsed.len() != specs.len() {
                return Ok(usage_error(vec!["invalid package spec".to_string()]));
            }
            if dry_run {
                dim("Dry run: input OK.");
                return Ok(0);
            }
            let api = match ctx.api_client() {
                Ok(api) => api,
                Err(e) => {
                    error(&e);
                    return Ok(1);
                }
            };
            let mut purls = Vec::with_capacity(parsed.len());
            for spec in &parsed {
                match spec.purl() {
                    Some(purl) => purls.push(purl),
                    None => {
                        let version = socket_core::registry::latest_version(api.http(), &spec.name)
                            .map_err(|e| {
                                format!("could not resolve latest version of {}: {}", spec.name, e)
                            })?;
                        purls.push(socket_core::purl::npm_purl(&spec.name, &version));
                    }
                }
            }
            let view_all = ctx.env.view_all_risks;
            let result: CResult<Value> = api
                .batch_package_alerts(&purls)
                .map(Value::Array)
                .into();
            Ok(emit(result, kind, |data| {
                let rows = data.as_array().cloned().unwrap_or_default();
                let reports = socket_core::alerts::parse_alert_rows(&rows);
                print!("{}", socket_core::alerts::render_report(&reports, view_all));
            }))
        }
        _ => {
            dim("Use `socket package score|shallow`.");
            Ok(0)
        }
    }
}

// ---- analytics ----

fn run_analytics(ctx: &mut CliContext, sub_m: &clap::ArgMatches) -> Result<i32, String> {
    let kind = match output_kind(sub_m) {
        Ok(kind) => kind,
        Err(code) => return Ok(code),
    };
    let scope = sub_m.get_one::<String>("scope").unwrap();
    let repo = sub_m.get_one::<String>("repo");
    if scope == "repo" && repo.is_none() {
        return Ok(usage_error(vec![
            "--repo is required when --scope is repo".to_string(),
        ]));
    }
    let days: u32 = sub_m.get_one::<String>("time").unwrap().parse().unwrap();
    if sub_m.get_flag("dry-run") {
        dim("Dry run: input OK.");
        return Ok(0);
    }
    let api = match ctx.api_client() {
        Ok(api) => api,
        Err(e) => {
            error(&e);
            return Ok(1);
        }
    };
    let result = match repo {
        Some(repo) if scope == "repo" => api.repo_analytics(repo, days),
        _ => api.org_analytics(days),
    };
    Ok(emit(result, kind, |data| {
        println!(
            "{}",
            serde_json::to_string_pretty(data).unwrap_or_default()
        );
    }))
}

fn main() {
    if !use_color() {
        colored::control::set_override(false);
    }

    let code = match std::panic::catch_unwind(run) {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            error(&e);
            1
        }
        Err(_) => {
            error("An unexpected error occurred. Please report this issue.");
            1
        }
    };
    socket_core::release_all_locks();
    std::process::exit(code);
}
