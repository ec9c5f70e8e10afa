use crate::models::{MissingReason, NotFoundReason, VerificationResult};
use std::io::Write;

/// Human-readable difference report, handy for logs and operators
pub fn difference_report(result: &VerificationResult) -> String {
    let s = &result.summary;
    let mut lines = vec![
        format!("=== VERIFICATION REPORT: delivery {} ===", result.delivery_id),
        String::new(),
        format!("Items on list:        {}", s.total_items),
        format!("Matched:              {} (inferred {})", s.matched, s.inferred),
        format!("Missing in delivery:  {} (ambiguous {})", s.missing, s.ambiguous),
        format!("Excess in delivery:   {}", s.excess),
        format!("Not found in system:  {}", s.not_found),
        format!("Duplicates:           {}", s.duplicates),
    ];

    if !result.missing.is_empty() {
        lines.push(String::new());
        lines.push("--- MISSING (to add to the delivery) ---".to_string());
        lines.extend(result.missing.iter().map(|m| {
            format!(
                "  [{}] {} - {}",
                m.position,
                m.item.raw_order_number.trim(),
                missing_reason(&m.reason)
            )
        }));
    }

    if !result.excess.is_empty() {
        lines.push(String::new());
        lines.push("--- EXCESS (to remove from the delivery) ---".to_string());
        lines.extend(result.excess.iter().map(|e| {
            format!(
                "  [{}] {} - qty {}",
                e.line.position,
                e.line.label(),
                e.line.quantity
            )
        }));
    }

    if !result.not_found.is_empty() {
        lines.push(String::new());
        lines.push("--- NOT FOUND IN SYSTEM ---".to_string());
        lines.extend(result.not_found.iter().map(|n| {
            format!(
                "  [{}] {} - {}",
                n.position,
                n.item.raw_order_number.trim(),
                not_found_reason(n.reason)
            )
        }));
    }

    if !result.duplicates.is_empty() {
        lines.push(String::new());
        lines.push("--- DUPLICATES ON LIST ---".to_string());
        lines.extend(result.duplicates.iter().map(|d| {
            format!(
                "  [{}] {} - repeats position {}",
                d.position,
                d.item.raw_order_number.trim(),
                d.first_position
            )
        }));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn missing_reason(reason: &MissingReason) -> String {
    match reason {
        MissingReason::NotInDelivery => "not in this delivery".to_string(),
        MissingReason::VariantNotInDelivery { requested } => {
            format!("variant {requested} not in this delivery")
        }
        MissingReason::CandidatesClaimed => "already matched by an earlier entry".to_string(),
        MissingReason::Ambiguous { candidates } => {
            format!("ambiguous: {}", candidates.join(", "))
        }
    }
}

fn not_found_reason(reason: NotFoundReason) -> &'static str {
    match reason {
        NotFoundReason::Unparsable => "unparsable",
        NotFoundReason::UnknownOrder => "unknown order",
    }
}

fn opt<T: ToString>(val: Option<T>) -> String {
    val.map(|v| v.to_string()).unwrap_or_default()
}

/// One CSV row per classified entry:
/// status, position, input, base, variant, quantity, order_id, order, detail
pub fn write_csv<W: Write>(result: &VerificationResult, writer: W) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record([
        "status", "position", "input", "base", "variant", "quantity", "order_id", "order", "detail",
    ])?;

    for m in &result.matched {
        w.write_record([
            "matched".to_string(),
            m.position.to_string(),
            m.item.raw_order_number.clone(),
            m.parsed.base.clone(),
            opt(m.parsed.variant),
            m.item.quantity.to_string(),
            m.line.order_id.to_string(),
            m.line.label(),
            format!("{:?}", m.confidence).to_lowercase(),
        ])?;
    }
    for m in &result.missing {
        w.write_record([
            "missing".to_string(),
            m.position.to_string(),
            m.item.raw_order_number.clone(),
            m.parsed.base.clone(),
            opt(m.parsed.variant),
            m.item.quantity.to_string(),
            String::new(),
            String::new(),
            missing_reason(&m.reason),
        ])?;
    }
    for e in &result.excess {
        w.write_record([
            "excess".to_string(),
            String::new(),
            String::new(),
            e.line.order_number.clone(),
            opt(e.line.variant),
            e.line.quantity.to_string(),
            e.line.order_id.to_string(),
            e.line.label(),
            format!("delivery position {}", e.line.position),
        ])?;
    }
    for n in &result.not_found {
        w.write_record([
            "not_found".to_string(),
            n.position.to_string(),
            n.item.raw_order_number.clone(),
            n.parsed.base.clone(),
            opt(n.parsed.variant),
            n.item.quantity.to_string(),
            String::new(),
            String::new(),
            not_found_reason(n.reason).to_string(),
        ])?;
    }
    for d in &result.duplicates {
        w.write_record([
            "duplicate".to_string(),
            d.position.to_string(),
            d.item.raw_order_number.clone(),
            String::new(),
            String::new(),
            d.item.quantity.to_string(),
            String::new(),
            String::new(),
            format!("repeats position {}", d.first_position),
        ])?;
    }

    w.flush()?;
    Ok(())
}
