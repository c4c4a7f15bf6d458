//! Serialized form of the values stored under one key: a JSON array of strings in insertion
//! order. Every `KeyValueClient` encodes `get` results here and the registry decodes them here.

/// 按插入顺序编码为 JSON 字符串数组
pub fn encode_values(values: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(values)
}

/// 解码结果：空载荷（空串、`null`、`[]`）统一视为没有值
pub fn decode_values(payload: &str) -> Result<Vec<String>, serde_json::Error> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    let values: Option<Vec<String>> = serde_json::from_str(payload)?;
    Ok(values.unwrap_or_default())
}
