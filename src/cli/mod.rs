//! CLI subcommands: new, show, add-liquid, add-solid, remove, set, volume,
//! units, catalog.
//!
//! Every command takes the current fragment (or a whole URL ending in one),
//! applies at most one edit, and prints the recipe plus the new location.

use crate::catalog::{CatalogFetcher, FileCatalog};
use crate::core::engine::{self, RecipeLine, VolumeBreakdown};
use crate::core::precision::display_amount;
use crate::core::session::{MemoryFragment, Session};
use crate::core::types::{parse_amount, FieldUpdate, IngredientId};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print an empty recipe fragment
    New,

    /// Compute the recipe held in a fragment
    Show {
        /// Fragment text or URL
        fragment: String,
    },

    /// Append a liquid
    AddLiquid {
        /// Fragment text or URL
        fragment: String,

        #[arg(short, long)]
        name: Option<String>,

        /// Percentage of total volume; omit to fill the remainder
        #[arg(short, long)]
        amount: Option<String>,
    },

    /// Append a solid
    AddSolid {
        /// Fragment text or URL
        fragment: String,

        #[arg(short, long)]
        name: Option<String>,

        /// Volume displaced per unit mass per unit total volume
        #[arg(short, long)]
        displacement: Option<String>,

        /// Concentration (mass per unit volume)
        #[arg(short, long)]
        amount: Option<String>,
    },

    /// Remove an ingredient by id
    Remove {
        /// Fragment text or URL
        fragment: String,

        id: IngredientId,
    },

    /// Change one field of one ingredient
    Set {
        /// Fragment text or URL
        fragment: String,

        id: IngredientId,

        field: Field,

        /// New value; empty or "-" unsets a number
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Set the total volume ("-" unsets it)
    Volume {
        /// Fragment text or URL
        fragment: String,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Set unit labels
    Units {
        /// Fragment text or URL
        fragment: String,

        #[arg(long)]
        volume: Option<String>,

        #[arg(long)]
        mass: Option<String>,
    },

    /// Load the known-solids catalog named by the fragment
    Catalog {
        /// Fragment text or URL
        fragment: String,

        /// Catalog directory
        #[arg(short, long, env = "RECIPECALC_CATALOG_DIR", default_value = "catalogs")]
        dir: PathBuf,

        /// Catalog key, overriding the one carried in the fragment
        #[arg(short, long)]
        key: Option<String>,

        /// Pre-fill this solid from the catalog (requires --name)
        #[arg(long, requires = "name")]
        solid: Option<IngredientId>,

        /// Known solid to copy into --solid
        #[arg(long, requires = "solid")]
        name: Option<String>,
    },
}

/// Editable ingredient fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Field {
    Name,
    Amount,
    Displacement,
}

impl Field {
    fn update(self, value: &str) -> FieldUpdate {
        match self {
            Field::Name => FieldUpdate::Name(value.to_string()),
            Field::Amount => FieldUpdate::Amount(parse_amount(value)),
            Field::Displacement => FieldUpdate::Displacement(parse_amount(value)),
        }
    }
}

/// Output settings shared by all commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalcConfig {
    /// Print a JSON report instead of text.
    pub json: bool,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands, config: &CalcConfig) -> Result<(), String> {
    let out = run(cmd, config)?;
    print!("{}", out);
    Ok(())
}

/// Run a command and return what it would print.
pub fn run(cmd: Commands, config: &CalcConfig) -> Result<String, String> {
    match cmd {
        Commands::New => cmd_edit("", config, |_| Ok(())),
        Commands::Show { fragment } => cmd_edit(&fragment, config, |_| Ok(())),
        Commands::AddLiquid {
            fragment,
            name,
            amount,
        } => cmd_edit(&fragment, config, |s| {
            let id = s.add_liquid().map_err(|e| e.to_string())?;
            if let Some(name) = name {
                s.update_field(id, FieldUpdate::Name(name))
                    .map_err(|e| e.to_string())?;
            }
            if let Some(amount) = amount {
                s.update_field(id, FieldUpdate::Amount(parse_amount(&amount)))
                    .map_err(|e| e.to_string())?;
            }
            Ok(())
        }),
        Commands::AddSolid {
            fragment,
            name,
            displacement,
            amount,
        } => cmd_edit(&fragment, config, |s| {
            let id = s.add_solid().map_err(|e| e.to_string())?;
            let updates = [
                name.map(FieldUpdate::Name),
                displacement.map(|d| FieldUpdate::Displacement(parse_amount(&d))),
                amount.map(|a| FieldUpdate::Amount(parse_amount(&a))),
            ];
            for update in updates.into_iter().flatten() {
                s.update_field(id, update).map_err(|e| e.to_string())?;
            }
            Ok(())
        }),
        Commands::Remove { fragment, id } => cmd_edit(&fragment, config, |s| {
            s.remove(id).map(|_| ()).map_err(|e| e.to_string())
        }),
        Commands::Set {
            fragment,
            id,
            field,
            value,
        } => cmd_edit(&fragment, config, |s| {
            s.update_field(id, field.update(&value))
                .map_err(|e| e.to_string())
        }),
        Commands::Volume { fragment, value } => cmd_edit(&fragment, config, |s| {
            s.set_total_volume(parse_amount(&value));
            Ok(())
        }),
        Commands::Units {
            fragment,
            volume,
            mass,
        } => cmd_edit(&fragment, config, |s| {
            if let Some(v) = volume {
                s.set_volume_units(&v);
            }
            if let Some(m) = mass {
                s.set_mass_units(&m);
            }
            Ok(())
        }),
        Commands::Catalog {
            fragment,
            dir,
            key,
            solid,
            name,
        } => cmd_catalog(&fragment, config, dir, key, solid.zip(name)),
    }
}

type EditSession = Session<MemoryFragment>;

fn cmd_edit(
    location: &str,
    config: &CalcConfig,
    edit: impl FnOnce(&mut EditSession) -> Result<(), String>,
) -> Result<String, String> {
    let mut session = Session::open(MemoryFragment::new(location));
    edit(&mut session)?;
    Ok(render(&session, location, config, None))
}

fn cmd_catalog(
    location: &str,
    config: &CalcConfig,
    dir: PathBuf,
    key: Option<String>,
    select: Option<(IngredientId, String)>,
) -> Result<String, String> {
    let mut session = Session::open(MemoryFragment::new(location));
    let key = key
        .or_else(|| session.catalog_key().map(str::to_string))
        .ok_or_else(|| "fragment carries no catalog key; pass --key".to_string())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {}", e))?;
    let result = runtime.block_on(async {
        let mut fetcher = CatalogFetcher::new(Arc::new(FileCatalog::new(dir)));
        fetcher.start(&key);
        fetcher.finish().await
    });
    session.apply_catalog(result);

    if let Some((id, name)) = select {
        session
            .select_known_solid(id, &name)
            .map_err(|e| e.to_string())?;
    }

    let known: Vec<(String, f64)> = session
        .known_solids()
        .iter()
        .map(|(n, d)| (n.clone(), *d))
        .collect();
    Ok(render(&session, location, config, Some(known)))
}

/// Replace the fragment part of `location`, keeping any URL prefix.
pub fn rewrite_location(location: &str, fragment: &str) -> String {
    match location.split_once('#') {
        Some((base, _)) if !base.is_empty() => format!("{}#{}", base, fragment),
        Some(_) => format!("#{}", fragment),
        None if location.contains("://") => format!("{}#{}", location, fragment),
        None => fragment.to_string(),
    }
}

#[derive(Serialize)]
struct Report<'a> {
    lines: Vec<ReportLine<'a>>,
    breakdown: Option<VolumeBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    known_solids: Option<Vec<(String, f64)>>,
    location: String,
}

#[derive(Serialize)]
struct ReportLine<'a> {
    #[serde(flatten)]
    line: &'a RecipeLine,
    display: String,
}

fn render(
    session: &EditSession,
    location: &str,
    config: &CalcConfig,
    known_solids: Option<Vec<(String, f64)>>,
) -> String {
    let lines = session.recipe();
    let location = rewrite_location(location, &session.fragment());

    if config.json {
        let report = Report {
            lines: lines
                .iter()
                .map(|line| ReportLine {
                    line,
                    display: line.display_amount(),
                })
                .collect(),
            breakdown: engine::breakdown(session.state()),
            known_solids,
            location,
        };
        return match serde_json::to_string_pretty(&report) {
            Ok(mut json) => {
                json.push('\n');
                json
            }
            Err(e) => format!("{{\"error\": \"{}\"}}\n", e),
        };
    }

    let mut out = String::new();
    let state = session.state();
    for (id, l) in &state.liquids {
        let amount = l
            .amount
            .map_or("fill".to_string(), |a| format!("{}%", display_amount(a)));
        out.push_str(&format!("  liquid {}: {} [{}]\n", id, l.name, amount));
    }
    for (id, s) in &state.solids {
        let show = |v: Option<f64>| v.map_or("-".to_string(), display_amount);
        out.push_str(&format!(
            "  solid {}: {} [displacement {}, {} {}/{}]\n",
            id,
            s.name,
            show(s.displacement),
            show(s.amount),
            state.mass_units,
            state.volume_units
        ));
    }
    if let Some(known) = known_solids {
        out.push_str(&format!("Known solids ({}):\n", known.len()));
        for (name, d) in known {
            out.push_str(&format!("  {}: {}\n", name, display_amount(d)));
        }
    }
    if !lines.is_empty() {
        let volume = state.total_volume.unwrap_or(f64::NAN);
        out.push_str(&format!(
            "Recipe ({} {}):\n",
            display_amount(volume),
            state.volume_units
        ));
        for line in &lines {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out.push_str(&location);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec;

    const TEXT: CalcConfig = CalcConfig { json: false };

    fn last_line(out: &str) -> String {
        out.lines().last().unwrap().to_string()
    }

    fn build_reference() -> String {
        let mut frag = last_line(&run(Commands::New, &TEXT).unwrap());
        let steps: Vec<Commands> = vec![
            Commands::Volume {
                fragment: String::new(),
                value: "100".into(),
            },
            Commands::AddLiquid {
                fragment: String::new(),
                name: Some("A".into()),
                amount: None,
            },
            Commands::AddLiquid {
                fragment: String::new(),
                name: Some("B".into()),
                amount: Some("25".into()),
            },
            Commands::AddSolid {
                fragment: String::new(),
                name: Some("C".into()),
                displacement: Some("0".into()),
                amount: Some("0.5".into()),
            },
        ];
        for step in steps {
            let step = with_fragment(step, &frag);
            frag = last_line(&run(step, &TEXT).unwrap());
        }
        frag
    }

    fn with_fragment(cmd: Commands, frag: &str) -> Commands {
        let f = frag.to_string();
        match cmd {
            Commands::Volume { value, .. } => Commands::Volume { fragment: f, value },
            Commands::AddLiquid { name, amount, .. } => Commands::AddLiquid {
                fragment: f,
                name,
                amount,
            },
            Commands::AddSolid {
                name,
                displacement,
                amount,
                ..
            } => Commands::AddSolid {
                fragment: f,
                name,
                displacement,
                amount,
            },
            other => other,
        }
    }

    #[test]
    fn test_new_prints_default_fragment() {
        let out = run(Commands::New, &TEXT).unwrap();
        assert_eq!(out.trim(), codec::encode(&Default::default()));
    }

    #[test]
    fn test_reference_recipe_through_cli() {
        let frag = build_reference();
        let out = run(Commands::Show { fragment: frag }, &TEXT).unwrap();
        assert!(out.contains("Recipe (100.0 mL):"));
        assert!(out.contains("  A: 75.00 mL\n"));
        assert!(out.contains("  B: 25.00 mL\n"));
        assert!(out.contains("  C: 50.00 g\n"));
    }

    #[test]
    fn test_set_and_remove() {
        let frag = build_reference();
        let out = run(
            Commands::Set {
                fragment: frag,
                id: IngredientId(1),
                field: Field::Amount,
                value: "-".into(),
            },
            &TEXT,
        )
        .unwrap();
        // both liquids now fill the remainder
        assert!(out.contains("  A: 50.00 mL\n"));
        assert!(out.contains("  B: 50.00 mL\n"));

        let out = run(
            Commands::Remove {
                fragment: last_line(&out),
                id: IngredientId(0),
            },
            &TEXT,
        )
        .unwrap();
        assert!(!out.contains("  A:"));
        assert_eq!(codec::decode(&last_line(&out)).next_id, 3);
    }

    #[test]
    fn test_listing_rounds_like_recipe() {
        let frag = build_reference();
        let out = run(
            Commands::Set {
                fragment: frag,
                id: IngredientId(1),
                field: Field::Amount,
                value: "0.30000000000000004".into(),
            },
            &TEXT,
        )
        .unwrap();
        assert!(out.contains("  liquid 1: B [0.3000%]\n"));
        let listing = &out[..out.len() - last_line(&out).len() - 1];
        assert!(!listing.contains("0.30000000000000004"));

        let out = run(
            Commands::Set {
                fragment: last_line(&out),
                id: IngredientId(2),
                field: Field::Displacement,
                value: "0.1".into(),
            },
            &TEXT,
        )
        .unwrap();
        assert!(out.contains("[displacement 0.1000, 0.5000 g/mL]"));
    }

    #[test]
    fn test_add_on_exhausted_fragment_errors() {
        let frag = codec::encode(&crate::core::types::RecipeState {
            next_id: u64::MAX,
            ..Default::default()
        });
        let err = run(
            Commands::AddLiquid {
                fragment: frag,
                name: None,
                amount: None,
            },
            &TEXT,
        )
        .unwrap_err();
        assert!(err.contains("exhausted"));
    }

    #[test]
    fn test_set_wrong_field_errors() {
        let frag = build_reference();
        let err = run(
            Commands::Set {
                fragment: frag,
                id: IngredientId(0),
                field: Field::Displacement,
                value: "1".into(),
            },
            &TEXT,
        )
        .unwrap_err();
        assert!(err.contains("has no field 'displacement'"));
    }

    #[test]
    fn test_url_location_is_preserved() {
        let frag = build_reference();
        let url = format!("https://example.org/calc/#{}", frag);
        let out = run(
            Commands::Units {
                fragment: url,
                volume: Some("L".into()),
                mass: None,
            },
            &TEXT,
        )
        .unwrap();
        let loc = last_line(&out);
        assert!(loc.starts_with("https://example.org/calc/#"));
        assert_eq!(codec::decode(&loc).volume_units, "L");
    }

    #[test]
    fn test_rewrite_location() {
        assert_eq!(rewrite_location("", "x"), "x");
        assert_eq!(rewrite_location("#old", "x"), "#x");
        assert_eq!(rewrite_location("http://a/#old", "x"), "http://a/#x");
        assert_eq!(rewrite_location("http://a/", "x"), "http://a/#x");
        assert_eq!(rewrite_location("old", "x"), "x");
    }

    #[test]
    fn test_json_report() {
        let frag = build_reference();
        let out = run(Commands::Show { fragment: frag }, &CalcConfig { json: true }).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["lines"][0]["name"], "A");
        assert_eq!(v["lines"][0]["display"], "75.00");
        assert_eq!(v["lines"][0]["group"], "fill");
        assert_eq!(v["lines"][2]["units"], "g");
        assert_eq!(v["breakdown"]["remainder"], 75.0);
        assert!(v.get("known_solids").is_none());
    }

    #[test]
    fn test_catalog_select() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("baking.json"), r#"{"sugar": 0.63}"#).unwrap();
        let frag = run(
            Commands::AddSolid {
                fragment: "#baking".into(),
                name: None,
                displacement: None,
                amount: None,
            },
            &TEXT,
        )
        .unwrap();
        let frag = last_line(&frag);
        assert_eq!(codec::decode(&frag).tinyurl.as_deref(), Some("baking"));

        let out = run(
            Commands::Catalog {
                fragment: frag,
                dir: dir.path().to_path_buf(),
                key: None,
                solid: Some(IngredientId(0)),
                name: Some("sugar".into()),
            },
            &TEXT,
        )
        .unwrap();
        assert!(out.contains("Known solids (1):"));
        let state = codec::decode(&last_line(&out));
        assert_eq!(state.solids[&IngredientId(0)].name, "sugar");
        assert_eq!(state.solids[&IngredientId(0)].displacement, Some(0.63));
    }

    #[test]
    fn test_catalog_missing_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(
            Commands::Catalog {
                fragment: "#ghost".into(),
                dir: dir.path().to_path_buf(),
                key: None,
                solid: None,
                name: None,
            },
            &TEXT,
        )
        .unwrap();
        assert!(out.contains("Known solids (0):"));
    }

    #[test]
    fn test_catalog_needs_key() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            Commands::Catalog {
                fragment: String::new(),
                dir: dir.path().to_path_buf(),
                key: None,
                solid: None,
                name: None,
            },
            &TEXT,
        )
        .unwrap_err();
        assert!(err.contains("--key"));
    }
}
