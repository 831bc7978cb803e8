//! 形態素解析を実行するユーティリティ
//!
//! このバイナリは、コンパイル済みのパターンモデルを読み込み、標準入力の
//! テキストを解析して標準出力へ書き出します。既定では各形態素を
//! 「表層 TAB 素性」の行で出力し、文ごとに `EOS` 行を置きます。

use std::error::Error;
use std::path::PathBuf;

use staccato::{Model, Tagger};

use clap::Parser;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "tokenize", about = "Analyzes morphemes with a compiled pattern model")]
struct Args {
    /// Directory containing the compiled patterns.
    #[clap(short = 'm', long)]
    model: PathBuf,

    /// Performs only segmentation.
    #[clap(short = 'w', long)]
    wakati: bool,

    /// Forces line-buffered output even when standard input is not a terminal.
    #[clap(short = 'c', long)]
    interactive: bool,
}

/// メイン関数
///
/// モデルをロードし、標準入力を解析して標準出力へ書き出します。
/// 標準入力が端末の場合は文ごとに出力をフラッシュします。
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let model = Model::read(&args.model)?;
    let tagger = Tagger::new(model)
        .segmentation(args.wakati)
        .interactive(args.interactive || atty::is(atty::Stream::Stdin));

    tagger.run(std::io::stdin().lock(), std::io::stdout().lock())?;

    Ok(())
}
