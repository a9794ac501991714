use crate::runner::state::{BatchReport, TestExecutionResult};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

/// Generate JUnit XML report string from a batch report
pub fn generate_junit_xml(report: &BatchReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total = report.summary.total.to_string();
    let failures = report.summary.failed.to_string();
    let time = seconds(report.summary.total_duration_ms);

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-explorer-run"));
    suites_start.push_attribute(("tests", total.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("skipped", "0"));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One suite per batch
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", "discovered-features"));
    suite_start.push_attribute(("tests", total.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("skipped", "0"));
    suite_start.push_attribute(("id", report.session_id.as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", report.generated_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for result in &report.results {
        write_test_case(&mut writer, result)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, result: &TestExecutionResult) -> Result<()> {
    let feature = &result.test_case.feature;
    let name = result.test_case.name();
    let classname = format!("explorer.{}", feature.feature_type);
    let time = seconds(result.duration);

    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));
    case_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(case_start))?;

    if !result.success {
        let message = result.error.as_deref().unwrap_or("Unknown error");
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", message));
        fail_start.push_attribute(("type", "AssertionError"));
        writer.write_event(Event::Start(fail_start))?;
        writer.write_event(Event::Text(BytesText::new(&format!(
            "selector: {}\n{}",
            feature.selector, message
        ))))?;
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    // Attachment convention understood by Jenkins and GitLab
    if let Some(screenshot) = &result.screenshot {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(&format!("[[ATTACHMENT|{}]]", screenshot))))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write report to file
pub fn write_report(report: &BatchReport, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    Ok(path)
}
