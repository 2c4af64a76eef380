//! Prompt bodies and canned localized replies
//!
//! The body stays in English for every target language; the language
//! preamble produced by the multilingual manager forces the output
//! language. Canned timeout/error messages exist for all 18 languages.

use tour_agent_core::{Language, QueryIntent};

/// English base prompt for an intent, with `{query}`, `{total_results}`,
/// `{results}`, `{enrichment}` and `{images}` placeholders
pub fn base_prompt(intent: QueryIntent) -> &'static str {
    match intent {
        QueryIntent::Factual => INFO_REQUEST,
        QueryIntent::Exploratory | QueryIntent::Filtered => RECOMMENDATION,
        QueryIntent::Navigational => ROUTE_PLANNING,
        QueryIntent::Comparative => FOLLOW_UP,
    }
}

const INFO_REQUEST: &str = r#"You are an expert Georgian tourism guide. A user asked: "{query}"

RELEVANT INFORMATION ({total_results} results):
{results}

ADDITIONAL DETAILS:
{enrichment}

AVAILABLE VISUALS:
{images}

INSTRUCTIONS:
- Provide comprehensive, engaging information (200-300 words)
- Use markdown formatting (headers, lists, emojis)
- Highlight unique cultural aspects
- Be enthusiastic and inspiring
- Reference available photos when relevant
- Include practical tips if applicable

Create an amazing response that makes them want to visit!"#;

const RECOMMENDATION: &str = r#"You are an expert Georgian tourism guide helping with recommendations: "{query}"

RELEVANT INFORMATION ({total_results} results):
{results}

ADDITIONAL DETAILS:
{enrichment}

AVAILABLE VISUALS:
{images}

INSTRUCTIONS:
- Suggest top 3-5 best options based on their interests
- Explain WHY each recommendation fits their needs
- Provide practical details (location, accessibility, best time)
- Use engaging, persuasive language (200-300 words)
- Include cultural context
- Reference available photos

Help them discover the perfect Georgian experience!"#;

const ROUTE_PLANNING: &str = r#"You are an expert Georgian tourism guide helping plan an itinerary: "{query}"

RELEVANT INFORMATION ({total_results} results):
{results}

ADDITIONAL DETAILS:
{enrichment}

AVAILABLE VISUALS:
{images}

INSTRUCTIONS:
- Create a logical, efficient route/plan
- Include travel times and practical logistics
- Suggest optimal visiting times
- Highlight must-see vs optional stops
- Provide insider tips (200-300 words)
- Make it realistic and enjoyable

Design the perfect Georgian adventure!"#;

const FOLLOW_UP: &str = r#"You are continuing a conversation about Georgian tourism: "{query}"

RELEVANT INFORMATION ({total_results} results):
{results}

ADDITIONAL DETAILS:
{enrichment}

AVAILABLE VISUALS:
{images}

INSTRUCTIONS:
- Provide additional relevant information (150-200 words)
- Build on previous conversation context
- Include new details not mentioned before
- Keep enthusiastic, helpful tone
- Reference available photos

Continue helping them explore Georgia!"#;

/// Canned reply when generation exceeds its deadline
pub fn timeout_message(language: Language) -> &'static str {
    match language {
        Language::En => "I apologize, but the request timed out. Please try again with a simpler question.",
        Language::Ru => "Извините, запрос превысил время ожидания. Пожалуйста, попробуйте задать более простой вопрос.",
        Language::Ka => "ვწუხვარ, მოთხოვნის დრო ამოიწურა. გთხოვთ, სცადოთ უფრო მარტივი კითხვა.",
        Language::De => "Entschuldigung, die Anfrage hat das Zeitlimit überschritten. Bitte versuchen Sie es mit einer einfacheren Frage.",
        Language::Fr => "Désolé, la demande a expiré. Veuillez réessayer avec une question plus simple.",
        Language::Es => "Lo siento, la solicitud ha excedido el tiempo. Por favor, intente con una pregunta más simple.",
        Language::It => "Mi dispiace, la richiesta è scaduta. Per favore, riprova con una domanda più semplice.",
        Language::Nl => "Sorry, het verzoek is verlopen. Probeer het opnieuw met een eenvoudigere vraag.",
        Language::Pl => "Przepraszam, żądanie przekroczyło czas. Proszę spróbować prostsze pytanie.",
        Language::Cs => "Omlouváme se, požadavek vypršel. Zkuste to prosím s jednodušší otázkou.",
        Language::Zh => "抱歉，请求超时。请尝试更简单的问题。",
        Language::Ja => "申し訳ございません。リクエストがタイムアウトしました。より簡単な質問でお試しください。",
        Language::Ko => "죄송합니다. 요청 시간이 초과되었습니다. 더 간단한 질문으로 다시 시도해 주세요.",
        Language::Ar => "عذراً، انتهت مهلة الطلب. يرجى المحاولة بسؤال أبسط.",
        Language::Tr => "Üzgünüm, istek zaman aşımına uğradı. Lütfen daha basit bir soruyla tekrar deneyin.",
        Language::Hi => "क्षमा करें, अनुरोध समय समाप्त हो गया। कृपया एक सरल प्रश्न के साथ पुनः प्रयास करें।",
        Language::Hy => "Ներողություն, հարցումը ժամանակից դուրս է: Խնդրում ենք փորձել ավելի պարզ հարցով:",
        Language::Az => "Üzr istəyirik, sorğunun vaxtı bitdi. Zəhmət olmasa daha sadə bir sualla yenidən cəhd edin.",
    }
}

/// Canned reply for any other generation failure
pub fn error_message(language: Language) -> &'static str {
    match language {
        Language::En => "I apologize, but I encountered a technical error. Please try again.",
        Language::Ru => "Извините, произошла техническая ошибка. Пожалуйста, попробуйте еще раз.",
        Language::Ka => "ვწუხვარ, მოხდა ტექნიკური შეცდომა. გთხოვთ, სცადოთ ხელახლა.",
        Language::De => "Entschuldigung, es ist ein technischer Fehler aufgetreten. Bitte versuchen Sie es erneut.",
        Language::Fr => "Désolé, une erreur technique s'est produite. Veuillez réessayer.",
        Language::Es => "Lo siento, ha ocurrido un error técnico. Por favor, inténtelo de nuevo.",
        Language::It => "Mi dispiace, si è verificato un errore tecnico. Per favore, riprova.",
        Language::Nl => "Sorry, er is een technische fout opgetreden. Probeer het opnieuw.",
        Language::Pl => "Przepraszam, wystąpił błąd techniczny. Proszę spróbować ponownie.",
        Language::Cs => "Omlouváme se, došlo k technické chybě. Zkuste to prosím znovu.",
        Language::Zh => "抱歉，发生了技术错误。请重试。",
        Language::Ja => "申し訳ございません。技術的なエラーが発生しました。もう一度お試しください。",
        Language::Ko => "죄송합니다. 기술적 오류가 발생했습니다. 다시 시도해 주세요.",
        Language::Ar => "عذراً، حدث خطأ تقني. يرجى المحاولة مرة أخرى.",
        Language::Tr => "Üzgünüm, teknik bir hata oluştu. Lütfen tekrar deneyin.",
        Language::Hi => "क्षमा करें, एक तकनीकी त्रुटि हुई। कृपया पुनः प्रयास करें।",
        Language::Hy => "Ներողություն, տեխնիկական սխալ է տեղի ունեցել: Խնդրում ենք նորից փորձել:",
        Language::Az => "Üzr istəyirik, texniki xəta baş verdi. Zəhmət olmasa yenidən cəhd edin.",
    }
}

/// Canned reply for an empty query
pub fn rephrase_message(language: Language) -> &'static str {
    match language {
        Language::Ru => "Пожалуйста, сформулируйте ваш вопрос.",
        Language::Ka => "გთხოვთ, ჩამოაყალიბოთ თქვენი კითხვა.",
        Language::De => "Bitte formulieren Sie Ihre Frage.",
        Language::Fr => "Veuillez formuler votre question.",
        Language::Es => "Por favor, formule su pregunta.",
        _ => "Please rephrase your question.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_canned_messages() {
        for lang in Language::ALL {
            assert!(!timeout_message(lang).is_empty());
            assert!(!error_message(lang).is_empty());
        }
    }

    #[test]
    fn test_base_prompt_carries_placeholders() {
        for intent in [
            QueryIntent::Factual,
            QueryIntent::Exploratory,
            QueryIntent::Navigational,
            QueryIntent::Comparative,
        ] {
            let template = base_prompt(intent);
            for placeholder in ["{query}", "{results}", "{enrichment}", "{images}"] {
                assert!(template.contains(placeholder));
            }
        }
    }
}
