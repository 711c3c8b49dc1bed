//! Board printing and move commands — `pipeline-board board` and
//! `pipeline-board move`.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use uuid::Uuid;

use pipeline_board::board::{BoardSession, MoveResult};
use pipeline_board::config::PipelineConfig;
use pipeline_board::store::db::{CrmDb, DbHandle};
use pipeline_common::{Deal, OwnerScope, QuickFilter, SortMode, Stage, TimeStatus, ViewState};

use crate::BoardArgs;

/// Open the database and load a board session for `view`.
async fn open_session(config: &PipelineConfig, view: ViewState) -> Result<BoardSession<DbHandle>> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!(
            "No database at {}. Run `pipeline-board init` first.",
            db_path.display()
        );
    }
    let db = CrmDb::new(&db_path).context("Failed to open CRM database")?;
    let board = &config.toml.board;
    let mut session = BoardSession::new(Arc::new(DbHandle::new(db)), view)
        .with_thresholds(board.card_thresholds(), board.header_thresholds());
    session.load().await?;
    Ok(session)
}

fn view_from_args(config: &PipelineConfig, args: &BoardArgs) -> Result<ViewState> {
    let mut view = config.view_state();
    if args.mine {
        view.owner_scope = OwnerScope::Owner(view.current_user_id.clone());
    }
    if let Some(search) = &args.search {
        view.search_term = search.clone();
    }
    if let Some(quick) = &args.quick {
        view.filters.quick_filter = quick.parse::<QuickFilter>().map_err(anyhow::Error::msg)?;
    }
    if let Some(sort) = &args.sort {
        view.sort_mode = sort.parse::<SortMode>().map_err(anyhow::Error::msg)?;
    }
    if let Some(min) = &args.min_value {
        view.filters.min_value =
            Some(Decimal::from_str(min).with_context(|| format!("Invalid --min-value: {}", min))?);
    }
    if let Some(max) = &args.max_value {
        view.filters.max_value =
            Some(Decimal::from_str(max).with_context(|| format!("Invalid --max-value: {}", max))?);
    }
    view.filters.tags = args
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(view)
}

fn status_label(status: TimeStatus) -> &'static str {
    match status {
        TimeStatus::Normal => "ok",
        TimeStatus::Warning => "aging",
        TimeStatus::Danger => "stale",
    }
}

pub async fn cmd_board(config: &PipelineConfig, args: &BoardArgs) -> Result<()> {
    let view = view_from_args(config, args)?;
    let session = open_session(config, view).await?;
    let Some(snapshot) = session.snapshot() else {
        bail!("Board is not loaded");
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    let active = session.view().filters.active_count();
    if active > 0 || !session.view().search_term.is_empty() {
        println!(
            "Showing {} deals ({} active filters)",
            snapshot.deal_count(),
            active
        );
        println!();
    }

    let health = session.column_health();
    for (stage_id, deal_ids) in session.controller().columns() {
        let Some(stage) = session.stage(stage_id) else {
            continue;
        };
        let metrics = snapshot
            .per_stage_metrics
            .iter()
            .find(|m| m.stage_id == stage_id);
        let (value, weighted) = metrics
            .map(|m| (m.value, m.weighted_value))
            .unwrap_or_default();
        let status = health
            .iter()
            .find(|h| h.stage_id == stage_id)
            .map(|h| status_label(h.status))
            .unwrap_or("ok");

        println!(
            "== {} ({}) value {} weighted {} [{}]",
            stage.name,
            deal_ids.len(),
            value.round_dp(2),
            weighted.round_dp(2),
            status
        );
        for deal_id in deal_ids {
            let Some(deal) = session.controller().deal(*deal_id) else {
                continue;
            };
            match session.card_insight(*deal_id) {
                Some(insight) => println!(
                    "   {:<32} {:<16} {:>12}  {:>3}d {:<5} {}%",
                    deal.name,
                    deal.company.name,
                    deal.value.round_dp(2),
                    insight.days_in_stage,
                    status_label(insight.time_status),
                    insight.probability
                ),
                None => println!("   {:<32} {:<16} {:>12}", deal.name, deal.company.name, deal.value),
            }
        }
    }

    println!();
    println!(
        "Total: {}  Weighted: {}  Active weighted: {}",
        snapshot.total_value.round_dp(2),
        snapshot.weighted_value.round_dp(2),
        snapshot.active_weighted_value.round_dp(2)
    );

    Ok(())
}

fn resolve_deal<'a>(deals: &'a [Deal], needle: &str) -> Result<&'a Deal> {
    if let Ok(id) = Uuid::parse_str(needle)
        && let Some(deal) = deals.iter().find(|d| d.id == id)
    {
        return Ok(deal);
    }
    let matches: Vec<&Deal> = deals
        .iter()
        .filter(|d| d.name.eq_ignore_ascii_case(needle))
        .collect();
    match matches.as_slice() {
        [deal] => Ok(*deal),
        [] => bail!("No deal matches '{}'", needle),
        _ => bail!(
            "'{}' matches {} deals; use the deal id instead",
            needle,
            matches.len()
        ),
    }
}

fn resolve_stage<'a>(stages: &'a [Stage], needle: &str) -> Result<&'a Stage> {
    if let Ok(id) = Uuid::parse_str(needle)
        && let Some(stage) = stages.iter().find(|s| s.id == id)
    {
        return Ok(stage);
    }
    stages
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(needle))
        .with_context(|| format!("No stage matches '{}'", needle))
}

pub async fn cmd_move(config: &PipelineConfig, deal: &str, stage: &str) -> Result<()> {
    let view = ViewState::for_user(&config.current_user());
    let mut session = open_session(config, view).await?;

    let (deal_id, deal_name, from_name) = {
        let deal = resolve_deal(session.deals(), deal)?;
        let from = session
            .stage(deal.stage_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| deal.stage_id.to_string());
        (deal.id, deal.name.clone(), from)
    };
    let (stage_id, stage_name) = {
        let stage = resolve_stage(session.stages(), stage)?;
        (stage.id, stage.name.clone())
    };

    session.drag_start(deal_id);
    session.drag_over(stage_id);
    match session.drag_end(Some(stage_id)).await {
        MoveResult::Moved { celebrated, .. } => {
            println!("Moved '{}' from {} to {}", deal_name, from_name, stage_name);
            if celebrated {
                println!("Deal won! '{}' closed.", deal_name);
            }
            Ok(())
        }
        MoveResult::NoMove(_) => {
            println!("'{}' is already in {}", deal_name, from_name);
            Ok(())
        }
        MoveResult::Failed(e) => Err(e.into()),
    }
}
