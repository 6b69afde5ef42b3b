//! Command-line front end for the dictionary store.
//!
//! # Responsibility
//! - Build the service from `LEXICON_*` environment configuration.
//! - Run one dictionary command per invocation and print its outcome.
//!
//! Usage:
//!   lexicon_cli version
//!   lexicon_cli select <polish>
//!   lexicon_cli merge <polish> <english> [sentence...]
//!   lexicon_cli delete-word <polish>
//!   lexicon_cli delete-translation <polish> <english>
//!   lexicon_cli delete-sentence <polish> <english> <sentence>

use lexicon_core::{
    init_logging, open_service, DictionaryConfig, DictionaryError, DictionaryService,
    NewTranslation, SqliteDictionaryStore, Word,
};
use log::warn;
use std::process::ExitCode;

const USAGE: &str = "usage: lexicon_cli <version|select|merge|delete-word|delete-translation|delete-sentence> [args...]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    if command == "version" {
        println!("lexicon_core version={}", lexicon_core::core_version());
        return ExitCode::SUCCESS;
    }

    let config = match DictionaryConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let service = match open_service(&config) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("{}", err.user_message());
            return ExitCode::FAILURE;
        }
    };

    match run(&service, command, rest) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(CliError::Usage) => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
        Err(CliError::Dictionary(err)) => {
            warn!("event=cli_command module=cli status=error error_code={}", err.code());
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

enum CliError {
    Usage,
    Dictionary(DictionaryError),
}

impl From<DictionaryError> for CliError {
    fn from(err: DictionaryError) -> Self {
        Self::Dictionary(err)
    }
}

fn run(
    service: &DictionaryService<SqliteDictionaryStore>,
    command: &str,
    args: &[String],
) -> Result<String, CliError> {
    match (command, args) {
        ("select", [polish]) => Ok(render_word(&service.select_word(polish)?)),
        ("merge", [polish, english, sentences @ ..]) => {
            let translation = NewTranslation::new(english.as_str(), sentences.iter().cloned());
            let outcome = service.merge_word(polish, &translation)?;
            Ok(outcome.to_string())
        }
        ("delete-word", [polish]) => {
            service.delete_word(polish)?;
            Ok("deleted".to_string())
        }
        ("delete-translation", [polish, english]) => {
            service.delete_translation(polish, english)?;
            Ok("deleted".to_string())
        }
        ("delete-sentence", [polish, english, sentence]) => {
            service.delete_sentence(polish, english, sentence)?;
            Ok("deleted".to_string())
        }
        _ => Err(CliError::Usage),
    }
}

fn render_word(word: &Word) -> String {
    let mut out = word.polish.clone();
    for translation in &word.translations {
        out.push_str(&format!("\n  {}", translation.english));
        for sentence in &translation.sentences {
            out.push_str(&format!("\n    - {}", sentence.sentence));
        }
    }
    out
}
