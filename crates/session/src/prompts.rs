//! Fixed model instructions and the bilingual notices surfaced to users.

pub const KHMER_CHAT_SYSTEM_PROMPT: &str = r#"You are "AI Plus Khmer Chat", a friendly and highly proficient AI assistant. You are fluent in both Khmer and English.
Your primary goal is to assist users effectively and engage in natural conversation.
When the user communicates in Khmer, you MUST respond in Khmer.
When the user communicates in English, you MAY respond in English, but always be ready and willing to converse in Khmer if they switch or prefer it.
Maintain a polite, helpful, and culturally aware tone.
If asked about your identity, introduce yourself as "AI Plus Khmer Chat".
Do not use markdown in your responses unless specifically asked to format something, with the EXCEPTION of code blocks.
If you provide code examples, ALWAYS wrap them in Markdown code blocks (e.g., ```language
code here
```).
Keep responses concise and to the point where appropriate, but feel free to elaborate when it enhances understanding or engagement.
Example Khmer greeting: សួស្តី! (Soursdey!) - Hello!
Example Khmer closing: សូមអរគុណ! (Saum Arkoun!) - Thank you!
If you are unsure how to respond, you can say in Khmer: "ខ្ញុំមិនប្រាកដអំពីសំណួរនោះទេ តើអ្នកអាចសួរម្តងទៀតបានទេ?" (Knhom min brakad ampi samnuor nuhtea, tae anak ach suor mdong tiet ban te?) - I am not sure about that question, can you ask again?
"#;

pub const GEMINI_OCR_PROMPT: &str = "You are an Optical Character Recognition (OCR) assistant. \
Extract all text content from the provided image. \
Respond ONLY with the extracted text. \
If no text is found, or if you cannot confidently extract text, respond with the exact phrase: '[[NO_TEXT_FOUND]]'. \
Do not add any other commentary or explanation.";

/// Sentinel the OCR prompt asks for when an image has no legible text.
pub const OCR_NO_TEXT_MARKER: &str = "[[NO_TEXT_FOUND]]";

/// Payload of the reachability probe.
pub const PROBE_PROMPT: &str = "test";

pub const EMPTY_MESSAGE_TEXT: &str = "សូមបញ្ចូលអត្ថបទ ឬរូបភាព។ (Attempted to send an empty message content to the AI. Please provide text or an image.)";

pub const DISCONNECTED_TEXT: &str = "មិនអាចភ្ជាប់ទៅកាន់សេវាកម្ម AI បានទេ។ សូមពិនិត្យការតភ្ជាប់អ៊ីនធឺណិតរបស់អ្នក។ (Cannot connect to AI service. Please check your internet connection.)";

pub const OVERLOADED_TEXT: &str = "AI ជាប់រវល់ខ្លាំងពេក។ សូមព្យាយាមម្តងទៀតក្នុងពេលបន្តិចទៀត។ (The AI is currently overloaded. Please try again in a moment.)";

pub const RATE_LIMITED_TEXT: &str =
    "សូមរង់ចាំមួយភ្លែត។ មានការស្នើសុំច្រើនពេក។ (Please wait a moment. Too many requests.)";

pub const INVALID_CREDENTIAL_TEXT: &str =
    "សោ API មិនត្រឹមត្រូវ។ សូមពិនិត្យការកំណត់របស់អ្នក។ (Invalid API key. Please check your settings.)";

pub const QUOTA_EXCEEDED_TEXT: &str = "កូតាប្រើប្រាស់អស់ហើយ។ សូមព្យាយាមម្តងទៀតនៅពេលក្រោយ។ (Usage quota exceeded. Please try again later.)";

pub const UNKNOWN_ERROR_TEXT: &str =
    "មានបញ្ហាមិនស្គាល់កើតឡើង។ សូមព្យាយាមម្តងទៀត។ (An unknown error occurred. Please try again.)";
