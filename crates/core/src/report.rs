//! Plain-text accuracy report.

use crate::constants::MANUAL_ACCURACY_WARNING_THRESHOLD;
use crate::reconciliation::ComprehensiveMetrics;
use std::fmt::Write;

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn heading(out: &mut String, title: &str) {
    let _ = write!(out, "\n{title}\n{}\n", "-".repeat(50));
}

fn count_line(out: &mut String, label: &str, count: usize, rate: f64) {
    let _ = writeln!(out, "  {label:<18}{count} ({})", pct(rate));
}

/// Render the six-section report for `metrics`.
pub fn render_report(metrics: &ComprehensiveMetrics) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);
    let _ = writeln!(out, "{rule}\nCODING ACCURACY ANALYSIS REPORT\n{rule}");

    let chart = &metrics.original_accuracy.chart_level;
    let code = &metrics.original_accuracy.code_level;
    heading(&mut out, "1. ORIGINAL ACCURACY (Before AI Review)");
    let _ = writeln!(out, "Chart-Level Accuracy:");
    count_line(&mut out, "Complete Matches:", chart.complete_matches, chart.complete_match_rate);
    count_line(&mut out, "Partial Matches:", chart.partial_matches, chart.partial_match_rate);
    count_line(&mut out, "No Matches:", chart.no_matches, chart.no_match_rate);
    let _ = writeln!(out, "  Total Patients:   {}", chart.total_patients);
    let _ = writeln!(out, "\nCode-Level Accuracy:");
    let _ = writeln!(out, "  Overall Accuracy: {}", pct(code.overall_accuracy));
    let _ = writeln!(out, "  Total Codes:      {}", code.total_baseline_codes);
    let _ = writeln!(out, "  Missed Codes:     {}", code.total_missed_codes);
    let _ = writeln!(out, "  Miss Rate:        {}", pct(code.miss_rate));

    let important = &metrics.code_importance_analysis.important_codes;
    let unimportant = &metrics.code_importance_analysis.unimportant_codes;
    heading(&mut out, "2. CODE IMPORTANCE ANALYSIS");
    let _ = writeln!(out, "Important Codes:");
    let _ = writeln!(out, "  Total Important:    {}", important.total_important_codes);
    let _ = writeln!(out, "  Missed Important:   {}", important.missed_important_codes);
    let _ = writeln!(out, "  Important Accuracy: {}", pct(important.important_code_accuracy));
    let _ = writeln!(out, "\nUnimportant Codes:");
    let _ = writeln!(out, "  Total Unimportant:    {}", unimportant.total_unimportant_codes);
    let _ = writeln!(out, "  Missed Unimportant:   {}", unimportant.missed_unimportant_codes);
    let _ = writeln!(out, "  Unimportant Accuracy: {}", pct(unimportant.unimportant_code_accuracy));

    let post = &metrics.post_ai_review;
    let improvements = &metrics.improvements;
    heading(&mut out, "3. POST AI REVIEW ACCURACY");
    let _ = writeln!(out, "Revised Chart-Level Accuracy:");
    count_line(&mut out, "Complete Matches:", post.complete_matches, post.complete_match_rate);
    count_line(&mut out, "Partial Matches:", post.partial_matches, post.partial_match_rate);
    count_line(&mut out, "No Matches:", post.no_matches, post.no_match_rate);
    let _ = writeln!(out, "\nImprovements:");
    let _ = writeln!(
        out,
        "  Partial -> Complete:  {}",
        improvements.partial_to_complete_conversions
    );
    let _ = writeln!(out, "  Accuracy Improvement: {}", pct(improvements.accuracy_improvement));

    let manual = &metrics.manual_coding_analysis;
    heading(&mut out, "4. MANUAL CODING ACCURACY ANALYSIS");
    let _ = writeln!(out, "Manual Coding Performance:");
    let _ = writeln!(out, "  Total Reviewed Codes:   {}", manual.total_reviewed_codes);
    let _ = writeln!(out, "  Baseline Errors:        {}", manual.baseline_errors);
    let _ = writeln!(out, "  Manual Coding Accuracy: {}", pct(manual.manual_coding_accuracy));
    let _ = writeln!(out, "  AI Corrections Made:    {}", manual.ai_corrections);
    let _ = writeln!(out, "  Extra Codes by AI:      {}", manual.extra_codes_by_ai);

    let corrected = &metrics.corrected_code_accuracy;
    heading(&mut out, "5. CORRECTED CODE-LEVEL ACCURACY");
    let _ = writeln!(out, "Post-Review Code Accuracy:");
    let _ = writeln!(out, "  Total Codes Reviewed:   {}", corrected.total_codes_reviewed);
    let _ = writeln!(out, "  AI Correct Codes:       {}", corrected.ai_correct_codes);
    let _ = writeln!(out, "  Baseline Correct Codes: {}", corrected.baseline_correct_codes);
    let _ = writeln!(out, "  Corrected Accuracy:     {}", pct(corrected.corrected_accuracy));

    let no_match = &metrics.no_match_analysis;
    let exclusions = &metrics.reconciliation_exclusions;
    let improvement = post.complete_match_rate - chart.complete_match_rate;
    heading(&mut out, "6. SUMMARY");
    let _ = writeln!(out, "Overall Chart Accuracy Improvement: {}", pct(improvement));
    let _ = writeln!(
        out,
        "From {} to {}",
        pct(chart.complete_match_rate),
        pct(post.complete_match_rate)
    );
    let _ = writeln!(
        out,
        "Partial match reviews used: {} ({} recovered from raw text)",
        metrics.post_review_code_accuracy.patient_corrections.len(),
        exclusions.recovered_from_raw_text
    );
    let _ = writeln!(
        out,
        "No match cases successfully reviewed: {} of {} ({})",
        no_match.successful_reviews,
        no_match.total_no_match_cases,
        pct(no_match.review_success_rate)
    );
    let skipped = exclusions.unusable_results
        + exclusions.unknown_patients
        + exclusions.outside_review_category;
    if skipped > 0 {
        let _ = writeln!(
            out,
            "Review results excluded: {skipped} (unusable {}, unknown patient {}, wrong category {})",
            exclusions.unusable_results,
            exclusions.unknown_patients,
            exclusions.outside_review_category
        );
    }

    if manual.manual_coding_accuracy < MANUAL_ACCURACY_WARNING_THRESHOLD {
        let _ = writeln!(
            out,
            "\nWARNING: Manual coding accuracy is {} - significant room for improvement",
            pct(manual.manual_coding_accuracy)
        );
    } else {
        let _ = writeln!(
            out,
            "\nManual coding accuracy is good at {}",
            pct(manual.manual_coding_accuracy)
        );
    }

    if important.important_code_accuracy < unimportant.unimportant_code_accuracy {
        let _ = writeln!(
            out,
            "\nWARNING: AI has higher miss rate for IMPORTANT codes ({}) vs unimportant codes ({})",
            pct(important.important_miss_rate),
            pct(unimportant.unimportant_miss_rate)
        );
    } else {
        let _ = writeln!(out, "\nAI performs better on important codes than unimportant codes");
    }

    out
}
