//! 学習側で使う小さなユーティリティ

use csv_core::ReadFieldResult;

/// CSV形式の行を解析してフィールドに分割します。
///
/// ダブルクォートで囲まれたフィールドや、フィールド内のカンマも
/// 正しく処理します。
pub(crate) fn parse_csv_row(row: &str) -> Vec<String> {
    let mut fields = vec![];
    let mut reader = csv_core::Reader::new();
    let mut bytes = row.as_bytes();
    // フィールドは行より長くならないため、出力バッファは溢れない
    let mut output = vec![0; row.len() + 2];
    loop {
        let (result, nin, nout) = reader.read_field(bytes, &mut output);
        let end = match result {
            ReadFieldResult::InputEmpty | ReadFieldResult::End => true,
            ReadFieldResult::Field { .. } => false,
            ReadFieldResult::OutputFull => unreachable!("field larger than its row"),
        };
        fields.push(String::from_utf8_lossy(&output[..nout]).into_owned());
        if end {
            break;
        }
        bytes = &bytes[nin..];
    }
    fields
}

/// `n` 個目のカンマのバイト位置を返します。
///
/// カンマが足りない場合は末尾 (改行を除く) の位置を返します。
pub(crate) fn nth_comma(s: &str, n: usize) -> usize {
    let mut seen = 0;
    for (at, b) in s.bytes().enumerate() {
        if b == b',' {
            seen += 1;
            if seen == n {
                return at;
            }
        }
    }
    s.trim_end_matches('\n').len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_row() {
        assert_eq!(parse_csv_row("名詞,トスカーナ"), vec!["名詞", "トスカーナ"]);
        assert_eq!(
            parse_csv_row("\"1,2-ジクロロエタン\",0,名詞"),
            vec!["1,2-ジクロロエタン", "0", "名詞"]
        );
    }

    #[test]
    fn test_nth_comma() {
        let feature = "\t名詞,普通名詞,*,*,本,ほん\n";
        assert_eq!(&feature[..nth_comma(feature, 4)], "\t名詞,普通名詞,*,*");
        assert_eq!(&feature[..nth_comma(feature, 99)], "\t名詞,普通名詞,*,*,本,ほん");
    }
}
