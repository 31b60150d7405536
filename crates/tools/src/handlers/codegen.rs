use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use crate::handlers::file_ops;
use autopilot_core::Observation;

const PYTHON_PIPELINE: &str = r#"import json
from datetime import datetime

import boto3

BUCKET = "solar-ontario-data"


def lambda_handler(event, context):
    s3 = boto3.client("s3")
    try:
        readings = process_readings(event)
        insights = summarize(readings)
        store(s3, insights)
        return {"statusCode": 200, "body": json.dumps(insights)}
    except Exception as exc:
        return {"statusCode": 500, "body": json.dumps({"error": str(exc)})}


def process_readings(event):
    readings = event.get("readings", [])
    capacity = sum(r.get("capacity_mw", 0) for r in readings)
    generation = sum(r.get("generation_mw", 0) for r in readings)
    return {
        "total_capacity_mw": capacity,
        "current_generation_mw": generation,
        "efficiency": generation / capacity if capacity else 0.0,
        "timestamp": datetime.utcnow().isoformat(),
    }


def summarize(readings):
    rating = "good" if readings["efficiency"] >= 0.6 else "needs attention"
    return {"readings": readings, "efficiency_rating": rating}


def store(s3, insights):
    key = "insights/{}/solar_insights.json".format(datetime.utcnow().strftime("%Y/%m/%d"))
    s3.put_object(
        Bucket=BUCKET,
        Key=key,
        Body=json.dumps(insights),
        ContentType="application/json",
    )
"#;

const RUST_PIPELINE: &str = r#"use std::io::{self, BufRead};

fn main() {
    let stdin = io::stdin();
    let mut capacity = 0.0_f64;
    let mut generation = 0.0_f64;

    for line in stdin.lock().lines().map_while(Result::ok) {
        let mut fields = line.split(',');
        let cap: f64 = fields.next().and_then(|f| f.trim().parse().ok()).unwrap_or(0.0);
        let gen: f64 = fields.next().and_then(|f| f.trim().parse().ok()).unwrap_or(0.0);
        capacity += cap;
        generation += gen;
    }

    let efficiency = if capacity > 0.0 { generation / capacity } else { 0.0 };
    println!("capacity={capacity} generation={generation} efficiency={efficiency:.2}");
}
"#;

/// Template source for a language, if one exists.
pub fn template_for(language: &str) -> Option<&'static str> {
    match language.to_lowercase().as_str() {
        "python" | "py" => Some(PYTHON_PIPELINE),
        "rust" | "rs" => Some(RUST_PIPELINE),
        _ => None,
    }
}

pub async fn generate(
    ctx: &ExecutionContext,
    language: &str,
    output_path: &str,
) -> Result<Observation, ToolError> {
    let code = template_for(language).ok_or_else(|| {
        ToolError::Unsupported(format!("code generation for language '{}'", language))
    })?;

    let mut observation = file_ops::create_file(ctx, output_path, code).await?;
    observation.message = format!("{} pipeline code generated", language);
    observation
        .payload
        .insert("file".to_string(), output_path.into());
    observation
        .payload
        .insert("code_length".to_string(), code.len().into());
    Ok(observation)
}
