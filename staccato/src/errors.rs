//! エラー型の定義
//!
//! このモジュールは、staccatoで使用されるすべてのエラー型を定義します。

use std::io;
use std::path::PathBuf;

/// staccato専用のResult型
///
/// エラー型としてデフォルトで[`StaccatoError`]を使用します。
pub type Result<T, E = StaccatoError> = std::result::Result<T, E>;

/// staccatoのエラー型
///
/// このライブラリで発生する可能性のあるすべてのエラーを表現します。
/// すべてのエラーは致命的であり、解析器・学習器のどちらにも局所的な
/// リカバリはありません。
#[derive(Debug, thiserror::Error)]
pub enum StaccatoError {
    /// 無効な引数エラー
    ///
    /// 開けない辞書・コーパスのパスの指定など、呼び出しの引数が
    /// 受け付けられない場合に発生します。`arg` は問題の引数名です。
    #[error("invalid argument `{arg}`: {msg}")]
    InvalidArgument {
        /// 引数の名前
        arg: &'static str,
        /// エラーメッセージ
        msg: String,
    },

    /// 無効なフォーマットエラー
    ///
    /// 学習コーパスや辞書の行、またはコンパイル中の表が想定した形式で
    /// ない場合に発生します。`what` は問題の入力の名前です。
    #[error("broken {what}: {msg}")]
    InvalidFormat {
        /// 入力の名前
        what: &'static str,
        /// エラーメッセージ
        msg: String,
    },

    /// モデルアーティファクトが開けない、またはマップできないエラー
    #[error("cannot open or map the model artifact: {path}")]
    ModelMissing {
        /// 開けなかったファイルのパス
        path: PathBuf,
        /// 元となったI/Oエラー
        #[source]
        source: io::Error,
    },

    /// パターン表層がシフト幅に収まらないエラー
    #[error("pattern surface longer than {max} bytes: {surface:?}")]
    PatternTooLong {
        /// 収まらなかった表層
        surface: String,
        /// 収容できる最大バイト数
        max: usize,
    },

    /// 素性文字列が長さフィールドに収まらないエラー
    #[error("feature string longer than {max} bytes: {feature:?}")]
    FeatureTooLong {
        /// 収まらなかった素性文字列
        feature: String,
        /// 収容できる最大バイト数
        max: usize,
    },

    /// 標準I/Oエラー
    ///
    /// [`std::io::Error`]のエラーバリアント。
    #[error(transparent)]
    StdIo(#[from] io::Error),
}

impl StaccatoError {
    /// 無効な引数エラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - 引数の名前
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument {
            arg,
            msg: msg.into(),
        }
    }

    /// 無効なフォーマットエラーを生成します
    ///
    /// # 引数
    ///
    /// * `what` - 入力の名前
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_format<S>(what: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat {
            what,
            msg: msg.into(),
        }
    }
}
