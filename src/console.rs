//! Text exchanges with the NuttX shell running on the board

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::channel::Channel;

/// How long the drain loop sleeps when nothing is buffered
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The value of a parameter as reported by `param show`, along with the raw response text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParamReading {
    pub value: Option<String>,
    pub response: String,
}

/// Collects everything the channel receives during `window` and returns it as text.
///
/// The loop only ends at the deadline, so a silent channel costs the whole window. Bytes that
/// are not valid UTF-8 are replaced rather than rejected.
pub fn drain<C: Channel + ?Sized>(channel: &mut C, window: Duration) -> io::Result<String> {
    let deadline = Instant::now().checked_add(window).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("drain window of {:?} is too long", window),
        )
    })?;
    let mut text = String::new();

    while Instant::now() < deadline {
        if channel.bytes_available()? > 0 {
            let bytes = channel.read_available()?;

            trace!("Drained {} bytes", bytes.len());

            text.push_str(&String::from_utf8_lossy(&bytes));
        } else {
            thread::sleep(POLL_INTERVAL);
        }
    }

    Ok(text)
}

/// Writes `command` followed by a newline, waits `settle` and returns what has been buffered by
/// then.
///
/// Only a single read is made after the settle time, so a response that is still being
/// transmitted will be cut short.
pub fn send_command<C: Channel + ?Sized>(
    channel: &mut C,
    command: &str,
    settle: Duration,
) -> io::Result<String> {
    debug!("Sending {:?}, settling for {:?}", command, settle);

    let mut line = Vec::with_capacity(command.len() + 1);
    line.extend_from_slice(command.as_bytes());
    line.push(b'\n');

    channel.write_all(&line)?;
    thread::sleep(settle);

    let bytes = channel.read_available()?;

    trace!("Received {} bytes in response to {:?}", bytes.len(), command);

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extracts the value of the parameter `name` from a `param show` response.
///
/// Every line starting with `name` that has at least two whitespace-separated tokens provides
/// a candidate, and the last one wins.
pub fn parse_param_value(response: &str, name: &str) -> Option<String> {
    let mut value = None;

    for line in response.lines().filter(|line| line.starts_with(name)) {
        if let Some(token) = line.split_whitespace().nth(1) {
            value = Some(token.to_owned());
        }
    }

    value
}

/// Reads the current value of the parameter `name`.
pub fn fetch_param<C: Channel + ?Sized>(
    channel: &mut C,
    name: &str,
    settle: Duration,
) -> io::Result<ParamReading> {
    let response = send_command(channel, &format!("param show {}", name), settle)?;
    let value = parse_param_value(&response, name);

    debug!("Parameter {} reads {:?}", name, value);

    Ok(ParamReading { value, response })
}

/// Sets the parameter `name` to `value` and returns the raw response.
pub fn set_param<C: Channel + ?Sized>(
    channel: &mut C,
    name: &str,
    value: &str,
    settle: Duration,
) -> io::Result<String> {
    send_command(channel, &format!("param set {} {}", name, value), settle)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::channel::fake::{FakeConsole, VER_ALL_RESPONSE};

    #[test]
    fn it_should_take_the_last_matching_line() {
        let response = "SYS_AUTOSTART 60100 \nSYS_AUTOSTART 4001 \n";

        assert_eq!(
            parse_param_value(response, "SYS_AUTOSTART"),
            Some("4001".to_owned())
        );
    }

    #[test]
    fn it_should_skip_matching_lines_without_a_value() {
        let response = "SYS_AUTOSTART 4001\r\nSYS_AUTOSTART\r\nnsh> ";

        assert_eq!(
            parse_param_value(response, "SYS_AUTOSTART"),
            Some("4001".to_owned())
        );
    }

    #[test]
    fn it_should_ignore_lines_that_do_not_start_with_the_name() {
        let response = "param show SYS_AUTOSTART\r\n  SYS_AUTOSTART 4001\r\nnsh> ";

        assert_eq!(parse_param_value(response, "SYS_AUTOSTART"), None);
    }

    #[test]
    fn it_should_return_none_for_an_empty_response() {
        assert_eq!(parse_param_value("", "SYS_AUTOSTART"), None);
    }

    #[test]
    fn it_should_match_on_prefix() {
        // `startswith` semantics: a longer name sharing the prefix also matches
        let response = "SYS_AUTOSTART 4001\r\nSYS_AUTOSTART_EXT 7\r\n";

        assert_eq!(
            parse_param_value(response, "SYS_AUTOSTART"),
            Some("7".to_owned())
        );
    }

    #[test]
    fn it_should_terminate_commands_with_a_newline() {
        let mut console = FakeConsole::new();

        let response = send_command(&mut console, "ver all", Duration::from_millis(0)).unwrap();

        assert_eq!(console.commands, vec!["ver all"]);
        assert!(response.starts_with("ver all\r\n"));
        assert!(response.contains(VER_ALL_RESPONSE));
        assert!(response.ends_with("nsh> "));
    }

    #[test]
    fn it_should_fetch_a_param_from_the_console() {
        let mut console = FakeConsole::new().with_param("SYS_AUTOSTART", "4001");

        let reading =
            fetch_param(&mut console, "SYS_AUTOSTART", Duration::from_millis(0)).unwrap();

        assert_eq!(reading.value, Some("4001".to_owned()));
        assert!(reading.response.contains("SYS_AUTOSTART 4001"));
        assert_eq!(console.commands, vec!["param show SYS_AUTOSTART"]);
    }

    #[test]
    fn it_should_report_a_missing_param_as_none() {
        let mut console = FakeConsole::new();

        let reading =
            fetch_param(&mut console, "SYS_AUTOSTART", Duration::from_millis(0)).unwrap();

        assert_eq!(reading.value, None);
        assert!(reading.response.contains("not found"));
    }

    #[test]
    fn it_should_set_a_param() {
        let mut console = FakeConsole::new().with_param("SYS_AUTOSTART", "4001");

        set_param(&mut console, "SYS_AUTOSTART", "60100", Duration::from_millis(0)).unwrap();

        assert_eq!(console.param("SYS_AUTOSTART"), Some("60100"));
        assert_eq!(console.commands, vec!["param set SYS_AUTOSTART 60100"]);
    }

    #[test]
    fn it_should_decode_invalid_utf8_lossily() {
        let mut console = FakeConsole::new()
            .with_boot_output(&hex!("4E 75 74 74 FF FE 58 0D 0A"))
            .with_short_reads();
        console.reset_input_buffer().unwrap();

        let text = drain(&mut console, Duration::from_millis(50)).unwrap();

        assert!(text.starts_with("Nutt"));
        assert!(text.ends_with("X\r\n"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn it_should_drain_for_the_whole_window() {
        let window = Duration::from_millis(350);
        let mut console = FakeConsole::new().with_boot_output(b"NuttShell (NSH) NuttX-11.0.0\r\n");
        console.reset_input_buffer().unwrap();

        let start = Instant::now();
        let text = drain(&mut console, window).unwrap();
        let elapsed = start.elapsed();

        assert_eq!(text, "NuttShell (NSH) NuttX-11.0.0\r\n");
        assert!(elapsed >= window, "returned early after {:?}", elapsed);
        assert!(
            elapsed <= window + POLL_INTERVAL + Duration::from_millis(150),
            "overran the window: {:?}",
            elapsed
        );
    }

    #[test]
    fn it_should_refuse_a_window_without_a_deadline() {
        let mut console = FakeConsole::new();

        let err = drain(&mut console, Duration::MAX).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn it_should_wait_out_a_silent_channel() {
        let window = Duration::from_millis(250);
        let mut console = FakeConsole::new();

        let start = Instant::now();
        let text = drain(&mut console, window).unwrap();

        assert!(text.is_empty());
        assert!(start.elapsed() >= window);
    }
}
