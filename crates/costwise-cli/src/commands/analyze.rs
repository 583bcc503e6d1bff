//! Engine command implementations
//!
//! Every command builds a `Request` and runs it through the engine. `ask`
//! classifies free text; the others pin the intent so classification is
//! skipped.

use anyhow::Result;
use costwise_core::{Intent, Payment, Request, RequestParams, StructuredResult, Term};

use super::{open_engine, run_request, GlobalOptions};

fn base_params(opts: &GlobalOptions) -> RequestParams {
    RequestParams {
        as_of: opts.as_of,
        ..Default::default()
    }
}

async fn run(opts: &GlobalOptions, request: Request) -> Result<StructuredResult> {
    let engine = open_engine(opts)?;
    run_request(&engine, request, opts.json).await
}

pub async fn cmd_ask(
    opts: &GlobalOptions,
    query: &str,
    intent: Option<Intent>,
    horizon: Option<usize>,
    confidence: Option<f64>,
    dimension: Option<&str>,
) -> Result<StructuredResult> {
    if !opts.json {
        println!("💬 {}", query);
    }
    let request = Request {
        query: query.to_string(),
        intent,
        params: RequestParams {
            horizon,
            confidence,
            dimension: dimension.map(str::to_string),
            ..base_params(opts)
        },
    };
    run(opts, request).await
}

pub async fn cmd_forecast(
    opts: &GlobalOptions,
    horizon: Option<usize>,
    confidence: Option<f64>,
    dimension: Option<&str>,
) -> Result<StructuredResult> {
    let request = Request::for_intent(Intent::Forecast).with_params(RequestParams {
        horizon,
        confidence,
        dimension: dimension.map(str::to_string),
        ..base_params(opts)
    });
    run(opts, request).await
}

pub async fn cmd_anomalies(
    opts: &GlobalOptions,
    threshold: Option<f64>,
    window: Option<usize>,
    dimension: Option<&str>,
) -> Result<StructuredResult> {
    let request = Request::for_intent(Intent::Anomaly).with_params(RequestParams {
        anomaly_threshold: threshold,
        anomaly_window: window,
        dimension: dimension.map(str::to_string),
        ..base_params(opts)
    });
    run(opts, request).await
}

pub async fn cmd_optimize(opts: &GlobalOptions) -> Result<StructuredResult> {
    let request = Request::for_intent(Intent::Optimize).with_params(base_params(opts));
    run(opts, request).await
}

pub async fn cmd_commitment(
    opts: &GlobalOptions,
    term: Term,
    payment: Payment,
    existing: f64,
) -> Result<StructuredResult> {
    let request = Request::for_intent(Intent::SavingsCommitment).with_params(RequestParams {
        term: Some(term),
        payment: Some(payment),
        existing_commitment: Some(existing),
        ..base_params(opts)
    });
    run(opts, request).await
}

pub async fn cmd_tags(opts: &GlobalOptions) -> Result<StructuredResult> {
    let request = Request::for_intent(Intent::TagCompliance).with_params(base_params(opts));
    run(opts, request).await
}

pub async fn cmd_overview(opts: &GlobalOptions) -> Result<StructuredResult> {
    let request = Request::for_intent(Intent::General).with_params(base_params(opts));
    run(opts, request).await
}
