//! # staccato
//!
//! staccatoは、パターンマッチに基づく高速な日本語形態素解析の実装です。
//!
//! ## 概要
//!
//! このライブラリは、学習コーパスと辞書から抽出したパターン (表層と直前の
//! 品詞の組に対する判定) をダブル配列トライへコンパイルし、実行時には
//! 最長一致の検索と文字種による連結だけでテキストを形態素に分割します。
//! ラティスも接続コストも持たないため、辞書引きとほぼ同じコストで解析が
//! 終わります。
//!
//! ## 主な機能
//!
//! - **パターンによる解析**: 最長一致検索と連結規則だけの単純な実行時
//! - **メモリマップされたモデル**: 4つの平坦なアーティファクトを読み取り専用で共有
//! - **品詞による絞り込み**: 直前の品詞を疑似コードポイントとして同じトライで検索
//! - **学習機能**: コーパスとCSV辞書からのパターン抽出 (`train`フィーチャー有効時)
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use staccato::{Model, PatternBuilder, Tagger};
//!
//! let corpus = "本\t名詞,普通名詞,*,*,本,ほん\nが\t助詞,格助詞,*,*,が,が\nEOS\n";
//! let dir = tempfile::tempdir()?;
//!
//! let mut builder = PatternBuilder::new();
//! builder.extract_from_readers(corpus.as_bytes(), Vec::<&[u8]>::new())?;
//! builder.write_patterns(dir.path())?;
//!
//! let tagger = Tagger::new(Model::read(dir.path())?);
//! let mut output = Vec::new();
//! tagger.run("本が\n".as_bytes(), &mut output)?;
//! assert_eq!(
//!     output,
//!     "本\t名詞,普通名詞,*,*,本,ほん\nが\t助詞,格助詞,*,*,が,が\nEOS\n".as_bytes()
//! );
//! # Ok(())
//! # }
//! ```

/// UTF-8デコードと文字種の判定
pub mod character;

/// エラー型の定義
pub mod errors;

/// 解析ループ用の固定長入出力バッファ
pub mod io;

/// コンパイル済みパターンモデルの読み込み
pub mod model;

/// 判定と素性情報のビットパック表現
pub mod record;

/// 解析の実行時ループ
pub mod tagger;

/// ダブル配列トライ
pub mod trie;

/// パターン抽出とモデルのコンパイル
///
/// `train`フィーチャーが有効な場合のみ利用可能です。
#[cfg(feature = "train")]
pub mod trainer;

#[cfg(feature = "train")]
mod utils;

// Re-exports
pub use errors::{Result, StaccatoError};
pub use model::Model;
pub use tagger::Tagger;

#[cfg(feature = "train")]
pub use trainer::PatternBuilder;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
