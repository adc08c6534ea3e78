use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use vantage_core::client::MarketDataClient;
use vantage_core::dashboard::{Dashboard, TITLE};
use vantage_core::endpoint::{param_choices, Category, Endpoint, Selection};
use vantage_core::render;

/// Menu loop: each pass is one selection, one fetch, one view. A failed action
/// prints its error and the loop carries on.
pub async fn run<C: MarketDataClient>(dashboard: &Dashboard<C>) -> anyhow::Result<()> {
    let mut prompter = Prompter::new(BufReader::new(tokio::io::stdin()));
    println!("{TITLE}\n");

    while let Some(selection) = choose_selection(&mut prompter).await? {
        println!("Working on it... {}", selection.endpoint.progress_message(&selection.params));
        match dashboard.run(&selection).await {
            Ok(view) => print!("{}", render::view(&view)),
            Err(err) => {
                crate::report(&err);
                print!("{}", render::error(&err));
            }
        }
        println!();
    }
    Ok(())
}

pub(crate) struct Prompter<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompter<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// `None` on end of input or `q`.
    async fn ask(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        let Some(line) = self.lines.next_line().await? else {
            return Ok(None);
        };
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }

    async fn choose(&mut self, title: &str, options: &[&str]) -> anyhow::Result<Option<usize>> {
        loop {
            println!("{title}");
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {option}", i + 1);
            }
            let prompt = format!("Choice [1-{}, q to quit]: ", options.len());
            let Some(answer) = self.ask(&prompt).await? else {
                return Ok(None);
            };
            if let Some(idx) = parse_choice(&answer, options) {
                return Ok(Some(idx));
            }
            println!("Not an option: {answer}");
        }
    }
}

fn parse_choice(answer: &str, options: &[&str]) -> Option<usize> {
    if let Ok(n) = answer.parse::<usize>() {
        return (1..=options.len()).contains(&n).then(|| n - 1);
    }
    options.iter().position(|o| o.eq_ignore_ascii_case(answer))
}

pub(crate) async fn choose_selection<R: AsyncBufRead + Unpin>(
    prompter: &mut Prompter<R>,
) -> anyhow::Result<Option<Selection>> {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
    let Some(idx) = prompter.choose("Choose a Data Category", &labels).await? else {
        return Ok(None);
    };
    let category = Category::ALL[idx];

    let endpoints: Vec<Endpoint> = category.endpoints().collect();
    let names: Vec<&str> = endpoints.iter().map(|e| e.function()).collect();
    let Some(idx) = prompter
        .choose("What kind of data are we fetching?", &names)
        .await?
    else {
        return Ok(None);
    };
    let endpoint = endpoints[idx];

    let mut selection = Selection::new(endpoint);
    for &param in endpoint.def().params {
        let choices = param_choices(endpoint, param);
        let prompt = if choices.is_empty() {
            format!("{} [{}]: ", param.label(), selection.params.get(param))
        } else {
            format!(
                "{} ({}) [{}]: ",
                param.label(),
                choices.join("/"),
                selection.params.get(param)
            )
        };

        loop {
            let Some(answer) = prompter.ask(&prompt).await? else {
                return Ok(None);
            };
            if answer.is_empty() {
                break;
            }
            match selection.set(param, &answer) {
                Ok(()) => break,
                Err(err) => println!("{err}"),
            }
        }
    }
    Ok(Some(selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::endpoint::Interval;

    async fn select(script: &str) -> Option<Selection> {
        let mut prompter = Prompter::new(script.as_bytes());
        choose_selection(&mut prompter).await.unwrap()
    }

    #[tokio::test]
    async fn picks_rsi_with_overrides() {
        let selection = select("4\n2\ngoog\nweekly\n\n\n").await.unwrap();
        assert_eq!(selection.endpoint, Endpoint::Rsi);
        assert_eq!(selection.params.symbol, "GOOG");
        assert_eq!(selection.params.interval, Interval::Weekly);
        assert_eq!(selection.params.time_period, 14);
    }

    #[tokio::test]
    async fn accepts_names_and_reprompts_bad_values() {
        let selection = select("technical indicators\nSMA\n\n\n0\n5\n\n").await.unwrap();
        assert_eq!(selection.endpoint, Endpoint::Sma);
        assert_eq!(selection.params.symbol, "TSLA");
        assert_eq!(selection.params.time_period, 5);
    }

    #[tokio::test]
    async fn quit_and_end_of_input_stop_the_loop() {
        assert!(select("q\n").await.is_none());
        assert!(select("1\n").await.is_none());
        assert!(select("").await.is_none());
    }

    #[tokio::test]
    async fn invalid_menu_choice_asks_again() {
        let selection = select("9\n1\n2\naapl\n").await.unwrap();
        assert_eq!(selection.endpoint, Endpoint::GlobalQuote);
        assert_eq!(selection.params.symbol, "AAPL");
    }

    #[test]
    fn parses_numbers_and_names() {
        let options = ["Time Series", "Fundamentals"];
        assert_eq!(parse_choice("2", &options), Some(1));
        assert_eq!(parse_choice("0", &options), None);
        assert_eq!(parse_choice("fundamentals", &options), Some(1));
        assert_eq!(parse_choice("forex", &options), None);
    }
}
