//! Integration tests for the linux-shell REPL.
//!
//! These drive `Repl::process_line` directly and check keyword handling,
//! diagnostics, and the usage reports a `timeX` line produces.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use lsh_repl::{LineResult, Repl, ShellConfig};
use rstest::rstest;

/// Writer that keeps everything in a buffer the test can inspect.
#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn repl() -> (Repl, Captured) {
    let captured = Captured::default();
    let config = ShellConfig {
        history: false,
        ..ShellConfig::default()
    };
    let repl = Repl::with_config(config)
        .expect("Failed to create REPL")
        .with_output(captured.clone());
    (repl, captured)
}

fn message(result: LineResult) -> Option<String> {
    match result {
        LineResult::Continue(m) | LineResult::Exit(m) => m,
    }
}

#[rstest]
#[case("", None)]
#[case("   \t ", None)]
#[case("exit 0", Some("linux-shell: 'exit' with other arguments!!!"))]
#[case("exit now please", Some("linux-shell: 'exit' with other arguments!!!"))]
#[case("timeX", Some("linux-shell: 'timeX' cannot be a standalone command"))]
#[case("  timeX  ", Some("linux-shell: 'timeX' cannot be a standalone command"))]
#[case("| ls", Some("linux-shell: should not have | as the first character"))]
#[case("ls |", Some("linux-shell: should not have | as the last character"))]
#[case("ls | | wc", Some("linux-shell: should not have two consecutive | without in-between command"))]
#[case("timeX | ls", Some("linux-shell: should not have | as the first character"))]
fn lines_that_keep_the_shell_running(#[case] line: &str, #[case] expected: Option<&str>) {
    let (mut repl, _) = repl();
    let result = repl.process_line(line).expect("non-fatal line");
    assert!(matches!(result, LineResult::Continue(_)), "{line:?} should continue");
    assert_eq!(message(result).as_deref(), expected);
}

#[rstest]
#[case("exit")]
#[case("  exit  ")]
fn exit_terminates(#[case] line: &str) {
    let (mut repl, _) = repl();
    let result = repl.process_line(line).unwrap();
    assert_eq!(result, LineResult::Exit(Some("linux-shell: Terminated".to_string())));
}

#[test]
fn custom_name_prefixes_diagnostics() {
    let config = ShellConfig {
        name: "mysh".to_string(),
        history: false,
        ..ShellConfig::default()
    };
    let mut repl = Repl::with_config(config).unwrap();
    let result = repl.process_line("exit").unwrap();
    assert_eq!(result, LineResult::Exit(Some("mysh: Terminated".to_string())));
}

#[test]
fn plain_pipeline_reports_nothing() {
    let (mut repl, captured) = repl();
    let result = repl.process_line("true | true").unwrap();
    assert_eq!(result, LineResult::Continue(None));
    assert_eq!(captured.text(), "");
    assert_eq!(repl.last_code(), 0);
}

#[test]
fn timex_reports_every_stage_in_order() {
    let (mut repl, captured) = repl();
    let result = repl.process_line("timeX sleep 0.1 | true | sleep 0").unwrap();
    assert_eq!(result, LineResult::Continue(None));

    let text = captured.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "one usage line per stage: {text:?}");
    for (line, cmd) in lines.iter().zip(["sleep", "true", "sleep"]) {
        assert!(line.starts_with("(PID)"), "{line}");
        assert!(line.contains(&format!("(CMD){cmd}    ")), "{line}");
        assert!(line.contains("(user)") && line.contains("(sys)"), "{line}");
    }
}

#[test]
fn exit_status_of_last_stage_is_kept() {
    let (mut repl, _) = repl();
    repl.process_line("true | false").unwrap();
    assert_eq!(repl.last_code(), 1);
    repl.process_line("false | true").unwrap();
    assert_eq!(repl.last_code(), 0);
}

#[test]
fn keyword_must_be_a_whole_word() {
    let (mut repl, _) = repl();
    // "exitfoo" is an ordinary (missing) program, not the exit keyword.
    let result = repl.process_line("exitfoo_not_a_program").unwrap();
    assert_eq!(result, LineResult::Continue(None));
    assert_eq!(repl.last_code(), 127);
}

#[test]
fn run_lines_skips_comments_and_stops_at_exit() {
    let (mut repl, captured) = repl();
    let code = repl.run_lines([
        "# a comment",
        "",
        "timeX true",
        "exit",
        "timeX true",
    ]);
    assert_eq!(code, std::process::ExitCode::SUCCESS);

    let text = captured.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "{text:?}");
    assert!(lines[0].contains("(CMD)true"));
    assert_eq!(lines[1], "linux-shell: Terminated");
}
