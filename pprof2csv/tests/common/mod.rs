//! Synthetic CPU profile of a small looping/sorting Go program.
//!
//! Sampled every 10ms with absolute build paths. `busyWork` is inlined into
//! three different callers.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use pprof2csv::pprof_parse::proto;
use prost::Message;
use std::io::Write;

pub const PROGRAM: &str = "/home/runner/work/pprof2csv/pprof2csv/test/loop/test.go";
const RAND: &str = "/usr/local/go/src/math/rand/rand.go";
const PROC: &str = "/usr/local/go/src/runtime/proc.go";
const PREEMPT: &str = "/usr/local/go/src/runtime/preempt_amd64.s";

pub const PERIOD_NANOS: i64 = 10_000_000;

pub const LOOP_QUERIES: &str = "\
main.benchmarkFunction
loop/test.go:23,if rand.Intn(2) == 0 {
loop/test.go:29,if data[j] > data[j+1] {
loop/test.go:30,data[j], data[j+1] = data[j+1], data[j]

main.busyWork
loop/test.go:13,sum += i * i

main.main
loop/test.go:63,time.Sleep(10 * time.Millisecond)
loop/test.go:69,benchmarkFunction(10000)
";

struct Strings(Vec<String>);

impl Strings {
    fn index(&mut self, s: &str) -> i64 {
        match self.0.iter().position(|t| t == s) {
            Some(idx) => idx as i64,
            None => {
                self.0.push(s.to_string());
                (self.0.len() - 1) as i64
            }
        }
    }
}

fn line(function_id: u64, line: i64) -> proto::Line {
    proto::Line { function_id, line }
}

fn location(id: u64, lines: Vec<proto::Line>) -> proto::Location {
    proto::Location {
        id,
        address: 0x40_0000 + id * 0x10,
        line: lines,
        ..Default::default()
    }
}

/// The workload profile: `samples/count` and `cpu/nanoseconds` values.
pub fn workload_profile() -> proto::Profile {
    let mut strings = Strings(vec![String::new()]);

    let sample_type = vec![
        proto::ValueType {
            r#type: strings.index("samples"),
            unit: strings.index("count"),
        },
        proto::ValueType {
            r#type: strings.index("cpu"),
            unit: strings.index("nanoseconds"),
        },
    ];

    let functions = [
        (1, "main.main", PROGRAM, 45),
        (2, "main.benchmarkFunction", PROGRAM, 19),
        (3, "main.busyWork", PROGRAM, 10),
        (4, "main.helper", PROGRAM, 40),
        (5, "math/rand.Intn", RAND, 200),
        (6, "runtime.main", PROC, 144),
        (7, "runtime.asyncPreempt", PREEMPT, 7),
    ];
    let function = functions
        .iter()
        .map(|&(id, name, file, start_line)| {
            let name = strings.index(name);
            proto::Function {
                id,
                name,
                system_name: name,
                filename: strings.index(file),
                start_line,
            }
        })
        .collect();

    let location = vec![
        location(1, vec![line(2, 29)]),
        location(2, vec![line(2, 30)]),
        location(3, vec![line(2, 28)]),
        location(4, vec![line(2, 23)]),
        location(5, vec![line(1, 69)]),
        location(6, vec![line(6, 250)]),
        location(7, vec![line(7, 47)]),
        location(8, vec![line(5, 202)]),
        location(9, vec![line(3, 13), line(2, 36)]),
        location(10, vec![line(3, 13), line(1, 61)]),
        location(11, vec![line(3, 13), line(4, 41)]),
        location(12, vec![line(1, 62)]),
    ];

    // Leaf first. Some stacks are split over several samples.
    let stacks: [(&[u64], i64); 10] = [
        (&[1, 5, 6], 400),
        (&[1, 5, 6], 19),
        (&[7, 1, 5, 6], 1),
        (&[2, 5, 6], 25),
        (&[3, 5, 6], 110),
        (&[8, 4, 5, 6], 3),
        (&[9, 5, 6], 40),
        (&[9, 5, 6], 7),
        (&[10, 6], 2),
        (&[11, 12, 6], 2),
    ];
    let sample = stacks
        .iter()
        .map(|&(ids, count)| proto::Sample {
            location_id: ids.to_vec(),
            value: vec![count, count * PERIOD_NANOS],
        })
        .collect();

    let period_type = Some(proto::ValueType {
        r#type: strings.index("cpu"),
        unit: strings.index("nanoseconds"),
    });

    proto::Profile {
        sample_type,
        sample,
        location,
        function,
        string_table: strings.0,
        period_type,
        period: PERIOD_NANOS,
        duration_nanos: 6_100_000_000,
        ..Default::default()
    }
}

pub fn workload_raw() -> Vec<u8> {
    workload_profile().encode_to_vec()
}

pub fn workload_gzip() -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&workload_raw()).unwrap();
    encoder.finish().unwrap()
}
