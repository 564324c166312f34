pub const REPLY_PROMPT: &str = "Give a very short answer to the input text:\nInput Text:";

#[must_use]
pub fn reply_prompt(text: &str) -> String {
	format!("{REPLY_PROMPT}{text}")
}
