use chrono::NaiveDate;
use polars::prelude::{AnyValue, Column, DataFrame};
use site_schedule::config::{SchedulerConfig, load_config_with_fallback};
use site_schedule::delay::{DelayEvent, DelayReason};
use site_schedule::logging::init_logging;
use site_schedule::portfolio::material_alerts;
use site_schedule::records::{parse_dependency_list, today};
use site_schedule::templates::{Chaining, TemplateLibrary};
use site_schedule::{
    MaterialStatus, ProjectMetadata, Schedule, WorkCalendarConfig, export_outcome_to_csv,
    load_schedule_from_csv, load_schedule_from_json, save_schedule_to_csv, save_schedule_to_json,
};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

fn parse_pred_list(s: &str) -> Vec<i32> {
    parse_dependency_list(Some(s), 0)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn cell_text(col: &Column, row_idx: usize) -> String {
    match col.get(row_idx) {
        Ok(AnyValue::Null) | Err(_) => String::new(),
        Ok(AnyValue::Int32(v)) => v.to_string(),
        Ok(AnyValue::Int64(v)) => v.to_string(),
        Ok(AnyValue::String(s)) => s.to_string(),
        Ok(AnyValue::List(inner)) => match inner.i32() {
            Ok(ca) => ca
                .into_iter()
                .flatten()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            Err(_) => inner.to_string(),
        },
        Ok(av) => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let cells: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| columns.iter().map(|col| cell_text(col, row_idx)).collect())
        .collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_table(schedule: &mut Schedule) {
    match schedule.dataframe() {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error rendering schedule: {}", e),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show the computed schedule\n  add <id> <name> <duration_days> [preds_csv]\n                                     Upsert a task (preds like 1,2,3)\n  delete <id>                        Delete a task and clean up dependencies\n  start <id> <YYYY-MM-DD|none>       Set or clear a start-no-earlier-than date\n  pct <id> <float>                   Set percent_complete\n  material <id> <status>             Set material status (not_ordered|ordered|delivered|installed)\n  compute                            Refresh the schedule and print a summary\n  active [YYYY-MM-DD]                List tasks in progress on a date (default today)\n  alerts                             List materials that still need ordering\n  baseline capture|clear             Snapshot current dates as the baseline, or drop it\n  delay add <days> <reason> <ids_csv> [YYYY-MM-DD]\n                                     Record a delay event (lengthens affected tasks)\n  delay list                         List recorded delay events\n  delay remove <id>                  Revert and remove a delay event\n  holiday add|remove <YYYY-MM-DD>    Edit the project's non-working days\n  template list                      List WBS templates\n  template apply <name> [chain]      Append a template's tasks\n  meta show                          Show project metadata\n  meta name|client|status <text...>  Update project fields\n  meta start <YYYY-MM-DD>            Update the project start date\n  calendar show                      Display calendar configuration\n  calendar set <json_path>           Load calendar config from JSON file\n  calendar save <json_path>          Save current calendar config to JSON file\n  save <json|csv> <path>             Persist schedule to disk\n  load <json|csv> <path>             Load schedule from disk\n  export <path>                      Write computed dates to CSV\n  db save                            Store the project in the configured database\n  db load <project_id>               Load a project from the configured database\n  quit|exit                          Exit"
    );
}

fn print_metadata(schedule: &Schedule) {
    let metadata = schedule.metadata();
    println!("Project id         : {}", metadata.project_id);
    println!("Project name       : {}", metadata.project_name);
    println!("Client             : {}", metadata.client_name);
    println!("Status             : {}", metadata.status);
    println!("Project start date : {}", metadata.project_start_date);
    let holidays = metadata
        .non_working_days
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Non-working days   : {}", holidays);
}

fn print_calendar_info(schedule: &Schedule) {
    let config = schedule.calendar_config();
    let working_days = config
        .working_days()
        .iter()
        .map(|wd| wd.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let blocked = config
        .blocked_dates()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Working days       : {}", working_days);
    println!("Blocked dates      : {}", blocked);
}

fn config_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn fresh_schedule(config: &SchedulerConfig) -> Schedule {
    Schedule::new_with_metadata_and_calendar(
        ProjectMetadata::default(),
        config.calendar_with(std::iter::empty()),
    )
    .with_options(config.engine_options())
}

#[cfg(feature = "sqlite")]
fn db_command(
    parts: &mut std::str::SplitWhitespace<'_>,
    config: &SchedulerConfig,
    schedule: &mut Schedule,
) {
    use site_schedule::{ScheduleStore, SqliteScheduleStore};

    let store = match SqliteScheduleStore::new(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            println!("Error opening {}: {}", config.database_path.display(), e);
            return;
        }
    };
    match parts.next() {
        Some("save") => match store.save_schedule(schedule) {
            Ok(_) => println!(
                "Project {} stored in {}.",
                schedule.project_id(),
                config.database_path.display()
            ),
            Err(e) => println!("Error storing project: {}", e),
        },
        Some("load") => match parts.next().and_then(|s| s.parse::<i32>().ok()) {
            Some(project_id) => match store.load_schedule(project_id) {
                Ok(Some(loaded)) => {
                    *schedule = loaded.with_options(config.engine_options());
                    println!("Project {} loaded.", project_id);
                    print_table(schedule);
                }
                Ok(None) => println!("Project {} not found.", project_id),
                Err(e) => println!("Error loading project: {}", e),
            },
            None => println!("Usage: db load <project_id>"),
        },
        _ => println!("Usage: db save|load <project_id>"),
    }
}

#[cfg(not(feature = "sqlite"))]
fn db_command(
    _parts: &mut std::str::SplitWhitespace<'_>,
    _config: &SchedulerConfig,
    _schedule: &mut Schedule,
) {
    println!("Rebuild with the `sqlite` feature to use the database.");
}

fn main() {
    let load = load_config_with_fallback(config_arg().as_deref());
    let config = load.config;
    init_logging(&config.log_level);
    if let Some(err) = load.error {
        tracing::warn!(error = %err, "using default configuration");
    }

    let mut schedule = fresh_schedule(&config);
    let templates = TemplateLibrary::builtin();

    println!("Site Schedule (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => print_table(&mut schedule),
            "add" => {
                let id_s = parts.next();
                let name_s = parts.next();
                let dur_s = parts.next();
                let preds_s = parts.next();
                match (id_s, name_s, dur_s) {
                    (Some(id_s), Some(name), Some(dur_s)) => {
                        let id: i32 = match id_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid id");
                                continue;
                            }
                        };
                        let duration_days: i64 = match dur_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid duration_days");
                                continue;
                            }
                        };
                        let preds = preds_s.map(parse_pred_list);
                        match schedule.upsert_task(id, name, duration_days, preds) {
                            Ok(_) => {
                                println!("Task upserted.");
                                print_table(&mut schedule);
                            }
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: add <id> <name> <duration_days> [preds_csv]"),
                }
            }
            "delete" => match parts.next().map(str::parse::<i32>) {
                Some(Ok(id)) => {
                    if schedule.delete_task(id) {
                        println!("Deleted task {id}.");
                        print_table(&mut schedule);
                    } else {
                        println!("Task {id} not found.");
                    }
                }
                Some(Err(_)) => println!("Invalid id"),
                None => println!("Usage: delete <id>"),
            },
            "start" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let date_s = parts.next();
                match (id, date_s) {
                    (Some(id), Some(date_s)) => {
                        let date = if date_s == "none" {
                            None
                        } else {
                            match parse_date(date_s) {
                                Some(d) => Some(d),
                                None => {
                                    println!("Invalid date (YYYY-MM-DD)");
                                    continue;
                                }
                            }
                        };
                        match schedule.set_start_override(id, date) {
                            Ok(_) => {
                                println!("Start override set.");
                                print_table(&mut schedule);
                            }
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: start <id> <YYYY-MM-DD|none>"),
                }
            }
            "pct" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let val = parts.next().and_then(|s| s.parse::<f64>().ok());
                match (id, val) {
                    (Some(id), Some(val)) => match schedule.set_percent_complete(id, val) {
                        Ok(_) => println!("percent_complete set."),
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: pct <id> <float>"),
                }
            }
            "material" => {
                let id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let status = parts.next().and_then(MaterialStatus::from_str);
                match (id, status) {
                    (Some(id), Some(status)) => match schedule.set_material_status(id, status) {
                        Ok(_) => println!("Material status set to {}.", status.as_str()),
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!(
                        "Usage: material <id> <not_ordered|ordered|delivered|installed>"
                    ),
                }
            }
            "compute" => {
                let summary = schedule.refresh();
                println!("Refreshed ({})", summary.to_cli_summary());
                print_table(&mut schedule);
            }
            "active" => {
                let date = match parts.next() {
                    Some(s) => match parse_date(s) {
                        Some(d) => d,
                        None => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    },
                    None => today(),
                };
                let active = schedule.active_tasks_on(date);
                let ids = active
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                println!("Active on {}: {} task(s) [{}]", date, active.len(), ids);
            }
            "alerts" => {
                let snapshot = site_schedule::portfolio::ProjectSchedule {
                    project_id: schedule.project_id(),
                    project_name: schedule.project_name().to_string(),
                    outcome: schedule.current_outcome().clone(),
                };
                let alerts = material_alerts(std::slice::from_ref(&snapshot), today());
                if alerts.is_empty() {
                    println!("No material alerts.");
                }
                for alert in alerts {
                    println!(
                        "Task {} {}: order by {} (lead {} days){}",
                        alert.task_id,
                        alert.task_name,
                        alert.order_by,
                        alert.lead_time_days,
                        if alert.overdue { " OVERDUE" } else { "" }
                    );
                }
            }
            "baseline" => match parts.next() {
                Some("capture") | None => {
                    let snapshot = schedule.capture_baseline();
                    println!("Baseline captured for {} task(s).", snapshot.len());
                }
                Some("clear") => {
                    schedule.clear_baseline();
                    println!("Baseline cleared.");
                }
                Some(other) => println!("Unknown baseline command '{}'.", other),
            },
            "delay" => match parts.next() {
                Some("add") => {
                    let days = parts.next().and_then(|s| s.parse::<i64>().ok());
                    let reason = parts.next().map(DelayReason::parse_lenient);
                    let ids = parts.next().map(parse_pred_list);
                    let date = match parts.next() {
                        Some(s) => match parse_date(s) {
                            Some(d) => d,
                            None => {
                                println!("Invalid date (YYYY-MM-DD)");
                                continue;
                            }
                        },
                        None => today(),
                    };
                    match (days, reason, ids) {
                        (Some(days), Some(reason), Some(ids)) => {
                            let event = DelayEvent::new(
                                schedule.next_delay_id(),
                                schedule.project_id(),
                                reason,
                                days,
                                ids,
                                date,
                            );
                            let delay_id = event.id;
                            match schedule.record_delay(event) {
                                Ok(touched) => {
                                    println!(
                                        "Delay {} recorded ({} task(s) lengthened).",
                                        delay_id,
                                        touched.len()
                                    );
                                    print_table(&mut schedule);
                                }
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: delay add <days> <reason> <ids_csv> [YYYY-MM-DD]"),
                    }
                }
                Some("list") | None => {
                    if schedule.delay_events().is_empty() {
                        println!("No delay events.");
                    }
                    for event in schedule.delay_events() {
                        let ids = event
                            .affected_task_ids
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(",");
                        println!(
                            "Delay {}: {} {} day(s) on {} affecting [{}]",
                            event.id,
                            event.reason.as_str(),
                            event.days_lost,
                            event.event_date,
                            ids
                        );
                    }
                }
                Some("remove") => match parts.next().and_then(|s| s.parse::<i32>().ok()) {
                    Some(id) => match schedule.remove_delay(id) {
                        Ok(_) => {
                            println!("Delay {} removed.", id);
                            print_table(&mut schedule);
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    None => println!("Usage: delay remove <id>"),
                },
                Some(other) => println!("Unknown delay command '{}'.", other),
            },
            "holiday" => {
                let action = parts.next();
                let date = parts.next().and_then(parse_date);
                match (action, date) {
                    (Some("add"), Some(date)) => {
                        schedule.add_non_working_day(date);
                        println!("Non-working day {} added.", date);
                    }
                    (Some("remove"), Some(date)) => {
                        if schedule.remove_non_working_day(date) {
                            println!("Non-working day {} removed.", date);
                        } else {
                            println!("{} was not a non-working day.", date);
                        }
                    }
                    _ => println!("Usage: holiday add|remove <YYYY-MM-DD>"),
                }
            }
            "template" => match parts.next() {
                Some("list") | None => {
                    for (category, template) in templates.iter() {
                        println!("  {:<16} {} task(s)", category, template.task_count());
                    }
                }
                Some("apply") => match parts.next() {
                    Some(name) => {
                        let chaining = match parts.next() {
                            Some("chain") => Chaining::Sequential,
                            _ => Chaining::None,
                        };
                        match templates.get(name) {
                            Some(template) => match schedule.apply_template(template, chaining) {
                                Ok(ids) => {
                                    println!("Template '{}' added {} task(s).", name, ids.len());
                                    print_table(&mut schedule);
                                }
                                Err(e) => println!("Error applying template: {}", e),
                            },
                            None => println!(
                                "Unknown template '{}'. Use 'template list' to list options.",
                                name
                            ),
                        }
                    }
                    None => println!("Usage: template apply <name> [chain]"),
                },
                Some(other) => println!("Unknown template command '{}'.", other),
            },
            "meta" => match parts.next() {
                Some("show") | None => print_metadata(&schedule),
                Some(field @ ("name" | "client" | "status")) => {
                    let rest: Vec<&str> = parts.collect();
                    if rest.is_empty() {
                        println!("Usage: meta {} <text...>", field);
                        continue;
                    }
                    let text = rest.join(" ");
                    match field {
                        "name" => schedule.set_project_name(text),
                        "client" => schedule.set_client_name(text),
                        _ => schedule.set_status(text),
                    }
                    println!("Project {} updated.", field);
                    print_metadata(&schedule);
                }
                Some("start") => match parts.next().and_then(parse_date) {
                    Some(date) => {
                        schedule.set_project_start_date(date);
                        let summary = schedule.refresh();
                        println!("Project start updated ({}).", summary.to_cli_summary());
                    }
                    None => println!("Usage: meta start <YYYY-MM-DD>"),
                },
                Some(other) => {
                    println!("Unknown meta command '{}'.", other);
                    println!("Usage: meta show|name|client|status|start ...");
                }
            },
            "calendar" => match parts.next() {
                Some("show") | None => print_calendar_info(&schedule),
                Some("set") => match parts.next() {
                    Some(path) => match fs::read_to_string(path) {
                        Ok(contents) => match serde_json::from_str::<WorkCalendarConfig>(&contents)
                        {
                            Ok(config) => {
                                schedule.set_calendar_from_config(&config);
                                println!("Calendar updated from {}.", path);
                                print_calendar_info(&schedule);
                            }
                            Err(e) => println!("Invalid calendar JSON: {}", e),
                        },
                        Err(e) => println!("Error reading {}: {}", path, e),
                    },
                    None => println!("Usage: calendar set <json_path>"),
                },
                Some("save") => match parts.next() {
                    Some(path) => match serde_json::to_string_pretty(&schedule.calendar_config()) {
                        Ok(json) => match fs::write(path, json) {
                            Ok(_) => println!("Calendar saved to {}.", path),
                            Err(e) => println!("Error writing {}: {}", path, e),
                        },
                        Err(e) => println!("Error serializing calendar: {}", e),
                    },
                    None => println!("Usage: calendar save <json_path>"),
                },
                Some(other) => {
                    println!("Unknown calendar command '{}'.", other);
                    println!("Usage: calendar show|set <json_path>|save <json_path>");
                }
            },
            "save" => {
                let fmt = parts.next();
                let path = parts.next();
                let result = match (fmt, path) {
                    (Some("json"), Some(path)) => save_schedule_to_json(&schedule, path),
                    (Some("csv"), Some(path)) => save_schedule_to_csv(&schedule, path),
                    _ => {
                        println!("Usage: save <json|csv> <path>");
                        continue;
                    }
                };
                match result {
                    Ok(_) => println!("Schedule saved to {}.", path.unwrap_or_default()),
                    Err(e) => println!("Error saving schedule: {}", e),
                }
            }
            "load" => {
                let fmt = parts.next();
                let path = parts.next();
                let result = match (fmt, path) {
                    (Some("json"), Some(path)) => load_schedule_from_json(path),
                    (Some("csv"), Some(path)) => load_schedule_from_csv(path),
                    _ => {
                        println!("Usage: load <json|csv> <path>");
                        continue;
                    }
                };
                match result {
                    Ok(loaded) => {
                        schedule = loaded.with_options(config.engine_options());
                        println!("Schedule loaded from {}.", path.unwrap_or_default());
                        print_table(&mut schedule);
                    }
                    Err(e) => println!("Error loading schedule: {}", e),
                }
            }
            "export" => match parts.next() {
                Some(path) => match export_outcome_to_csv(schedule.current_outcome(), path) {
                    Ok(_) => println!("Computed schedule written to {}.", path),
                    Err(e) => println!("Error exporting schedule: {}", e),
                },
                None => println!("Usage: export <path>"),
            },
            "db" => db_command(&mut parts, &config, &mut schedule),
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
