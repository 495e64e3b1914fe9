mod common;

use pprof2csv::analyzer::{AnalyzerConfig, SourceLine, analyze, load_profile_data};
use pprof2csv::query::{QueryKey, match_queries, parse_queries};
use pprof2csv::report::{import_lines_csv, markdown_report, write_function_csv, write_lines_csv};
use std::io::Cursor;
use std::time::Duration;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn key(line_number: u64) -> QueryKey {
    QueryKey {
        filename: "loop/test.go".to_string(),
        line_number,
    }
}

fn assert_workload_results(lines: &[SourceLine]) {
    let sections = parse_queries(common::LOOP_QUERIES);
    let results = match_queries(&sections, lines);

    let expected = [
        (69, ms(0), ms(6050)),
        (29, ms(4190), ms(4200)),
        (30, ms(250), ms(250)),
        (13, ms(510), ms(510)),
        (23, ms(0), ms(30)),
        (63, ms(0), ms(0)),
    ];
    for (line_number, flat, cum) in expected {
        let result = &results[&key(line_number)];
        assert_eq!(result.flat, flat, "flat of line {}", line_number);
        assert_eq!(result.cum, cum, "cum of line {}", line_number);
    }
}

#[test]
fn raw_profile_produces_expected_line_costs() {
    let lines = analyze(&common::workload_raw(), &AnalyzerConfig::default()).unwrap();
    assert_workload_results(&lines);
}

#[test]
fn gzip_profile_produces_expected_line_costs() {
    let lines = analyze(&common::workload_gzip(), &AnalyzerConfig::default()).unwrap();
    assert_workload_results(&lines);
}

#[test]
fn profile_loaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cpu.pprof");
    std::fs::write(&path, common::workload_gzip()).unwrap();

    let lines = load_profile_data(&path, &AnalyzerConfig::default()).unwrap();
    assert_workload_results(&lines);
}

#[test]
fn hottest_line_comes_first() {
    let lines = analyze(&common::workload_gzip(), &AnalyzerConfig::default()).unwrap();

    // runtime.main is on every stack.
    assert_eq!(lines[0].function_name, "runtime.main");
    assert_eq!(lines[0].cum, ms(6090));
    assert_eq!(lines[1].line_number, 69);
    for pair in lines.windows(2) {
        assert!(pair[0].cum >= pair[1].cum);
    }
}

#[test]
fn count_sample_type_is_selectable() {
    let config = AnalyzerConfig {
        sample_index: Some(0),
    };
    let lines = analyze(&common::workload_raw(), &config).unwrap();

    // "count" is not a time unit; values are read as nanoseconds.
    let line_29 = lines
        .iter()
        .find(|l| l.line_number == 29 && l.function_name == "main.benchmarkFunction")
        .unwrap();
    assert_eq!(line_29.flat, Duration::from_nanos(419));
    assert_eq!(line_29.cum, Duration::from_nanos(420));
}

#[test]
fn function_csv_for_benchmark_section() {
    let lines = analyze(&common::workload_gzip(), &AnalyzerConfig::default()).unwrap();
    let sections = parse_queries(common::LOOP_QUERIES);
    let results = match_queries(&sections, &lines);

    let mut output = Vec::new();
    write_function_csv(&mut output, &sections[0], &results).unwrap();

    let expected = "file,line,code,flat,cum\n\
                    loop/test.go,23,if rand.Intn(2) == 0 {,0ns,30ms\n\
                    loop/test.go,29,if data[j] > data[j+1] {,4.19s,4.2s\n\
                    loop/test.go,30,\"data[j], data[j+1] = data[j+1], data[j]\",250ms,250ms\n";
    assert_eq!(String::from_utf8(output).unwrap(), expected);
}

#[test]
fn markdown_for_main_section() {
    let lines = analyze(&common::workload_gzip(), &AnalyzerConfig::default()).unwrap();
    let sections = parse_queries(common::LOOP_QUERIES);
    let results = match_queries(&sections, &lines);

    let report = markdown_report(&sections, &results);
    let expected = "## main.main\n\
                    \n\
                    | line | code | flat | cum |\n\
                    |---|---|---|---|\n\
                    | loop/test.go:63 | time.Sleep(10 * time.Millisecond) | 0ns | 0ns |\n\
                    | loop/test.go:69 | benchmarkFunction(10000) | 0ns | 6.05s |\n\
                    \n";
    assert!(report.ends_with(expected), "report was:\n{}", report);
    assert!(report.starts_with("## main.benchmarkFunction\n"));
    assert!(report.contains("| loop/test.go:13 | sum += i * i | 510ms | 510ms |"));
}

#[test]
fn exported_table_reimports_with_same_results() {
    let lines = analyze(&common::workload_gzip(), &AnalyzerConfig::default()).unwrap();

    let mut output = Vec::new();
    write_lines_csv(&mut output, &lines).unwrap();
    let imported = import_lines_csv(Cursor::new(output)).unwrap();

    assert_eq!(imported, lines);
    assert_workload_results(&imported);
}
