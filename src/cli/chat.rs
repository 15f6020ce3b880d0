//! Chat command - interactive assistant in the terminal

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::error;

use crate::domain::{ConversationTurn, ConversationalAssistant};
use crate::infrastructure::assistant::EXAMPLE_QUERIES;

const PROMPT: &str = "KCA University > ";

pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap();
    let context = crate::create_app_context(&config).await?;

    let mut out = io::stdout();
    print_banner(&mut out)?;

    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = run_session(context.assistant.as_ref(), input, &mut out) => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n\nSession interrupted. Goodbye!");
        }
    }

    Ok(())
}

fn print_banner(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "KCA University Academic Assistant")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(
        out,
        "Ask about the academic calendar, university rules, graduation or student services."
    )?;
    writeln!(out, "\nExample questions:")?;
    for query in EXAMPLE_QUERIES {
        writeln!(out, "   - {}", query)?;
    }
    writeln!(out, "\nType 'exit' to quit.\n")
}

/// Read questions line by line until `exit` or end of input
pub async fn run_session<R>(
    assistant: &dyn ConversationalAssistant,
    input: R,
    out: &mut impl Write,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut history: Vec<ConversationTurn> = Vec::new();

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out, "\nGoodbye!")?;
            return Ok(());
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("exit") {
            writeln!(out, "Thank you for using KCA University Assistant. Goodbye!")?;
            return Ok(());
        }

        match assistant.respond(&history, message).await {
            Ok(reply) => {
                writeln!(out, "\n{}\n", reply)?;
                history.push(ConversationTurn::user(message));
                history.push(ConversationTurn::assistant(reply));
            }
            Err(e) => {
                error!(error = %e, "Assistant failed to respond");
                writeln!(out, "\nAn error occurred: {}", e)?;
                writeln!(
                    out,
                    "Please try asking a different question about KCA University.\n"
                )?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::MockConversationalAssistant;
    use crate::domain::DomainError;
    use mockall::Sequence;

    #[tokio::test]
    async fn test_session_keeps_history() {
        let mut assistant = MockConversationalAssistant::new();
        let mut seq = Sequence::new();
        assistant
            .expect_respond()
            .withf(|history, message| history.is_empty() && message == "When does January start?")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("Jan 6".to_string()));
        assistant
            .expect_respond()
            .withf(|history, message| history.len() == 2 && message == "And May?")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("May 5".to_string()));

        let input: &[u8] = b"When does January start?\n\nAnd May?\nexit\nignored\n";
        let mut out = Vec::new();
        run_session(&assistant, input, &mut out).await.unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Jan 6"));
        assert!(output.contains("May 5"));
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_session_reports_errors_and_continues() {
        let mut assistant = MockConversationalAssistant::new();
        assistant
            .expect_respond()
            .times(1)
            .returning(|_, _| Err(DomainError::provider("bedrock", "throttled")));

        let input: &[u8] = b"fees?\n";
        let mut out = Vec::new();
        run_session(&assistant, input, &mut out).await.unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("An error occurred:"));
        assert!(output.contains("Please try asking a different question about KCA University."));
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[test]
    fn test_banner_lists_examples() {
        let mut out = Vec::new();
        print_banner(&mut out).unwrap();
        let output = String::from_utf8(out).unwrap();

        for query in EXAMPLE_QUERIES {
            assert!(output.contains(query));
        }
    }
}
