//! パターン抽出を実行するユーティリティ
//!
//! このバイナリは、学習コーパスとCSV辞書からパターンを抽出し、解析に使う
//! 4つのアーティファクトを指定されたディレクトリへ書き出します。

use std::error::Error;
use std::path::PathBuf;

use staccato::PatternBuilder;

use clap::Parser;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(
    name = "train",
    about = "Extracts and compiles patterns from a training corpus and CSV dictionaries"
)]
struct Args {
    /// Output directory for the compiled patterns.
    #[clap(short = 'm', long)]
    model: PathBuf,

    /// System dictionary in CSV format (repeatable, prepended).
    #[clap(short = 'd', long)]
    dict: Vec<PathBuf>,

    /// User dictionary in CSV format (repeatable, appended).
    #[clap(short = 'u', long)]
    user_dict: Vec<PathBuf>,

    /// Training corpus.
    corpus: PathBuf,
}

/// メイン関数
///
/// コーパスと辞書からパターンを抽出し、モデルを書き出します。
/// `-d` の辞書は後に指定されたものが先に読まれ、`-u` の辞書は
/// そのあとに続きます。
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut dicts: Vec<PathBuf> = args.dict.iter().rev().cloned().collect();
    dicts.extend(args.user_dict);

    let mut builder = PatternBuilder::new();
    builder.extract_patterns(&args.corpus, &dicts)?;
    builder.write_patterns(&args.model)?;

    Ok(())
}
