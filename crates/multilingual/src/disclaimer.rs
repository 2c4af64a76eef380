//! Disclaimers appended to generated answers
//!
//! Price, schedule, seasonal and transport statements get a localized
//! warning block. Tables are prebuilt for all 18 languages.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use tour_agent_core::Language;

const PRICE_KEYWORDS: &[&str] = &[
    "лари", "цена", "стоимость", "билет", "$", "₾", "euro", "доллар", "бесплатно", "платно",
    "тариф", "cost", "price", "fee", "free", "рубль", "preis", "kostenlos", "prix", "gratuit",
    "precio", "gratis", "prezzo", "ticket", "entrance", "admission",
];

const TIME_KEYWORDS: &[&str] = &[
    "время работы", "открыт", "график", "часы", "расписание", "закрыт", "opening hours",
    "schedule", "closed", "open", "working time", "hours", "öffnungszeiten", "geschlossen",
    "horaires", "fermé", "horario", "cerrado", "orari", "chiuso",
];

const SEASONAL_KEYWORDS: &[&str] = &[
    "зима", "снег", "горы", "трекинг", "лыжи", "альпинизм", "сезон", "winter", "snow", "hiking",
    "climbing", "ski", "mountain", "season", "sommer", "hiver", "invierno", "inverno", "estate",
];

const TRANSPORT_KEYWORDS: &[&str] = &[
    "маршрут", "добраться", "транспорт", "автобус", "поезд", "дорога", "route", "transport",
    "bus", "train", "car", "taxi", "road", "verkehr", "transports", "transporte",
];

/// Disclaimer category detected in an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisclaimerKind {
    Price,
    Schedule,
    Seasonal,
    Transport,
}

struct DisclaimerSet {
    price: &'static str,
    schedule: &'static str,
    seasonal: &'static str,
    transport: &'static str,
    header: &'static str,
}

impl DisclaimerSet {
    fn text(&self, kind: DisclaimerKind) -> &'static str {
        match kind {
            DisclaimerKind::Price => self.price,
            DisclaimerKind::Schedule => self.schedule,
            DisclaimerKind::Seasonal => self.seasonal,
            DisclaimerKind::Transport => self.transport,
        }
    }
}

static DISCLAIMERS: Lazy<HashMap<Language, DisclaimerSet>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(Language::En, DisclaimerSet {
        price: "⚠️ **Note**: Prices may change. Please verify current costs before visiting.",
        schedule: "🕒 **Note**: Opening hours may vary by season and holidays. Please check current schedule.",
        seasonal: "🌨️ **Important**: Mountain route accessibility depends on weather and season. Check conditions before traveling.",
        transport: "🚌 **Tip**: Public transport routes may change. Verify current schedules and routes.",
        header: "### ⚠️ Important Information:",
    });
    map.insert(Language::Ru, DisclaimerSet {
        price: "⚠️ **Внимание**: Цены могут изменяться. Рекомендуем уточнить актуальную стоимость перед посещением.",
        schedule: "🕒 **Примечание**: Время работы может изменяться в зависимости от сезона и праздников. Уточняйте актуальное расписание.",
        seasonal: "🌨️ **Важно**: Доступность горных маршрутов зависит от погодных условий и сезона. Проверяйте условия перед поездкой.",
        transport: "🚌 **Совет**: Маршруты общественного транспорта могут изменяться. Проверьте актуальное расписание и маршруты.",
        header: "### ⚠️ Важная информация:",
    });
    map.insert(Language::Ka, DisclaimerSet {
        price: "⚠️ **ყურადღება**: ფასები შეიძლება შეიცვალოს. გთხოვთ, გადაამოწმოთ ფასები ვიზიტამდე.",
        schedule: "🕒 **შენიშვნა**: სამუშაო საათები შეიძლება იცვლებოდეს სეზონისა და დღესასწაულების მიხედვით.",
        seasonal: "🌨️ **მნიშვნელოვანი**: მთის მარშრუტების ხელმისაწვდომობა დამოკიდებულია ამინდსა და სეზონზე.",
        transport: "🚌 **რჩევა**: საზოგადოებრივი ტრანსპორტის მარშრუტები შეიძლება შეიცვალოს.",
        header: "### ⚠️ მნიშვნელოვანი ინფორმაცია:",
    });
    map.insert(Language::De, DisclaimerSet {
        price: "⚠️ **Hinweis**: Preise können sich ändern. Bitte aktuelle Kosten vor dem Besuch prüfen.",
        schedule: "🕒 **Hinweis**: Öffnungszeiten können saisonal und an Feiertagen variieren.",
        seasonal: "🌨️ **Wichtig**: Bergwege-Zugänglichkeit hängt von Wetter und Jahreszeit ab.",
        transport: "🚌 **Tipp**: Öffentliche Verkehrsmittel können sich ändern. Aktuelle Fahrpläne prüfen.",
        header: "### ⚠️ Wichtige Information:",
    });
    map.insert(Language::Fr, DisclaimerSet {
        price: "⚠️ **Attention**: Les prix peuvent changer. Vérifiez les tarifs actuels avant votre visite.",
        schedule: "🕒 **Note**: Les horaires peuvent varier selon la saison et les jours fériés.",
        seasonal: "🌨️ **Important**: L'accès aux itinéraires de montagne dépend de la météo et de la saison.",
        transport: "🚌 **Conseil**: Les itinéraires de transport public peuvent changer. Vérifiez les horaires actuels.",
        header: "### ⚠️ Information importante:",
    });
    map.insert(Language::Es, DisclaimerSet {
        price: "⚠️ **Atención**: Los precios pueden cambiar. Verifique los costos actuales antes de visitar.",
        schedule: "🕒 **Nota**: Los horarios pueden variar según la temporada y los días festivos.",
        seasonal: "🌨️ **Importante**: La accesibilidad de las rutas de montaña depende del clima y la temporada.",
        transport: "🚌 **Consejo**: Las rutas de transporte público pueden cambiar. Verifique los horarios actuales.",
        header: "### ⚠️ Información importante:",
    });
    map.insert(Language::It, DisclaimerSet {
        price: "⚠️ **Attenzione**: I prezzi possono cambiare. Verificare i costi attuali prima della visita.",
        schedule: "🕒 **Nota**: Gli orari di apertura possono variare per stagione e festività.",
        seasonal: "🌨️ **Importante**: L'accessibilità dei percorsi montani dipende dal meteo e dalla stagione.",
        transport: "🚌 **Suggerimento**: Le rotte dei trasporti pubblici possono cambiare. Verificare gli orari attuali.",
        header: "### ⚠️ Informazioni importanti:",
    });
    map.insert(Language::Nl, DisclaimerSet {
        price: "⚠️ **Let op**: Prijzen kunnen veranderen. Controleer de huidige kosten voor uw bezoek.",
        schedule: "🕒 **Opmerking**: Openingstijden kunnen variëren per seizoen en feestdagen.",
        seasonal: "🌨️ **Belangrijk**: Toegankelijkheid van bergroutes hangt af van het weer en seizoen.",
        transport: "🚌 **Tip**: Openbaar vervoerroutes kunnen wijzigen. Controleer actuele dienstregelingen.",
        header: "### ⚠️ Belangrijke informatie:",
    });
    map.insert(Language::Pl, DisclaimerSet {
        price: "⚠️ **Uwaga**: Ceny mogą się zmieniać. Sprawdź aktualne koszty przed wizytą.",
        schedule: "🕒 **Uwaga**: Godziny otwarcia mogą się zmieniać w zależności od sezonu i świąt.",
        seasonal: "🌨️ **Ważne**: Dostępność tras górskich zależy od pogody i sezonu.",
        transport: "🚌 **Wskazówka**: Trasy transportu publicznego mogą się zmieniać. Sprawdź aktualne rozkłady.",
        header: "### ⚠️ Ważne informacje:",
    });
    map.insert(Language::Cs, DisclaimerSet {
        price: "⚠️ **Upozornění**: Ceny se mohou měnit. Ověřte aktuální náklady před návštěvou.",
        schedule: "🕒 **Poznámka**: Otevírací doba se může měnit podle sezóny a svátků.",
        seasonal: "🌨️ **Důležité**: Přístupnost horských tras závisí na počasí a sezóně.",
        transport: "🚌 **Tip**: Trasy veřejné dopravy se mohou měnit. Ověřte aktuální jízdní řády.",
        header: "### ⚠️ Důležité informace:",
    });
    map.insert(Language::Zh, DisclaimerSet {
        price: "⚠️ **注意**：价格可能会变化。请在访问前确认最新价格。",
        schedule: "🕒 **注意**：营业时间可能因季节和节假日而异。",
        seasonal: "🌨️ **重要**：山区路线的可达性取决于天气和季节。",
        transport: "🚌 **提示**：公共交通路线可能会变化。请确认最新时刻表。",
        header: "### ⚠️ 重要信息：",
    });
    map.insert(Language::Ja, DisclaimerSet {
        price: "⚠️ **注意**：料金は変更される場合があります。訪問前に最新の料金をご確認ください。",
        schedule: "🕒 **注意**：営業時間は季節や祝日により変更される場合があります。",
        seasonal: "🌨️ **重要**：山岳ルートへのアクセスは天候と季節によります。",
        transport: "🚌 **ヒント**：公共交通機関のルートは変更される場合があります。",
        header: "### ⚠️ 重要な情報：",
    });
    map.insert(Language::Ko, DisclaimerSet {
        price: "⚠️ **주의**: 가격은 변경될 수 있습니다. 방문 전 최신 요금을 확인하세요.",
        schedule: "🕒 **참고**: 운영 시간은 계절과 공휴일에 따라 달라질 수 있습니다.",
        seasonal: "🌨️ **중요**: 산악 경로 접근성은 날씨와 계절에 따라 다릅니다.",
        transport: "🚌 **팁**: 대중교통 노선은 변경될 수 있습니다. 최신 시간표를 확인하세요.",
        header: "### ⚠️ 중요 정보:",
    });
    map.insert(Language::Ar, DisclaimerSet {
        price: "⚠️ **تنبيه**: قد تتغير الأسعار. يرجى التحقق من التكاليف الحالية قبل الزيارة.",
        schedule: "🕒 **ملاحظة**: قد تختلف ساعات العمل حسب الموسم والعطلات.",
        seasonal: "🌨️ **هام**: تعتمد إمكانية الوصول إلى الطرق الجبلية على الطقس والموسم.",
        transport: "🚌 **نصيحة**: قد تتغير خطوط النقل العام. تحقق من الجداول الحالية.",
        header: "### ⚠️ معلومات هامة:",
    });
    map.insert(Language::Tr, DisclaimerSet {
        price: "⚠️ **Dikkat**: Fiyatlar değişebilir. Ziyaretten önce güncel fiyatları kontrol edin.",
        schedule: "🕒 **Not**: Açılış saatleri mevsime ve tatil günlerine göre değişebilir.",
        seasonal: "🌨️ **Önemli**: Dağ rotalarına erişim hava durumu ve mevsime bağlıdır.",
        transport: "🚌 **İpucu**: Toplu taşıma güzergahları değişebilir. Güncel tarifeleri kontrol edin.",
        header: "### ⚠️ Önemli Bilgi:",
    });
    map.insert(Language::Hi, DisclaimerSet {
        price: "⚠️ **ध्यान दें**: कीमतें बदल सकती हैं। यात्रा से पहले वर्तमान लागत सत्यापित करें।",
        schedule: "🕒 **नोट**: खुलने का समय मौसम और छुट्टियों के अनुसार भिन्न हो सकता है।",
        seasonal: "🌨️ **महत्वपूर्ण**: पहाड़ी मार्गों की पहुंच मौसम और ऋतु पर निर्भर करती है।",
        transport: "🚌 **सुझाव**: सार्वजनिक परिवहन मार्ग बदल सकते हैं। वर्तमान समय सारणी जांचें।",
        header: "### ⚠️ महत्वपूर्ण जानकारी:",
    });
    map.insert(Language::Hy, DisclaimerSet {
        price: "⚠️ **Ուշադրություն**: Գները կարող են փոխվել։ Այցից առաջ ստուգեք ընթացիկ գները։",
        schedule: "🕒 **Նշում**: Աշխատանքային ժամերը կարող են տարբերվել սեզոնի և տոների համաձայն։",
        seasonal: "🌨️ **Կարևոր**: Լեռնային երթուղիների հասանելիությունը կախված է եղանակից և սեզոնից։",
        transport: "🚌 **Խորհուրդ**: Հասարակական տրանսպորտի երթուղիները կարող են փոխվել։",
        header: "### ⚠️ Կարևոր տեղեկատվություն:",
    });
    map.insert(Language::Az, DisclaimerSet {
        price: "⚠️ **Diqqət**: Qiymətlər dəyişə bilər. Ziyarətdən əvvəl cari xərcləri yoxlayın.",
        schedule: "🕒 **Qeyd**: İş saatları mövsümə və bayramlara görə dəyişə bilər.",
        seasonal: "🌨️ **Vacib**: Dağ marşrutlarına çıxış hava şəraiti və mövsümdən asılıdır.",
        transport: "🚌 **Məsləhət**: İctimai nəqliyyat marşrutları dəyişə bilər.",
        header: "### ⚠️ Vacib məlumat:",
    });
    map
});

/// Manages adding disclaimers to generated answers
#[derive(Debug, Default)]
pub struct DisclaimerManager;

impl DisclaimerManager {
    pub fn new() -> Self {
        Self
    }

    /// Detect which warning categories an answer touches
    pub fn detect_content_types(&self, answer: &str) -> Vec<DisclaimerKind> {
        let lowered = answer.to_lowercase();
        let mut kinds = Vec::new();

        if PRICE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            kinds.push(DisclaimerKind::Price);
        }
        if TIME_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            kinds.push(DisclaimerKind::Schedule);
        }
        if SEASONAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            kinds.push(DisclaimerKind::Seasonal);
        }
        if TRANSPORT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            kinds.push(DisclaimerKind::Transport);
        }

        kinds
    }

    /// Append localized disclaimers for every detected category.
    /// Returns the answer unchanged when nothing matched.
    pub fn add_disclaimers(&self, answer: &str, language: Language) -> String {
        let kinds = self.detect_content_types(answer);
        if kinds.is_empty() {
            return answer.to_string();
        }

        let set = DISCLAIMERS
            .get(&language)
            .unwrap_or_else(|| &DISCLAIMERS[&Language::En]);

        let sections: Vec<&str> = kinds.iter().map(|kind| set.text(*kind)).collect();
        format!(
            "{answer}\n\n---\n\n{}\n\n{}",
            set.header,
            sections.join("\n\n")
        )
    }

    /// Whether an answer already carries a disclaimer block
    pub fn has_disclaimer(&self, answer: &str) -> bool {
        answer.contains("⚠️")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_languages_have_tables() {
        for lang in Language::ALL {
            assert!(DISCLAIMERS.contains_key(&lang), "missing table for {lang}");
        }
    }

    #[test]
    fn test_price_and_transport_detection() {
        let manager = DisclaimerManager::new();
        let kinds =
            manager.detect_content_types("The ticket price is 10 lari, take the bus from Didube");
        assert!(kinds.contains(&DisclaimerKind::Price));
        assert!(kinds.contains(&DisclaimerKind::Transport));
    }

    #[test]
    fn test_disclaimer_appended_in_target_language() {
        let manager = DisclaimerManager::new();
        let answer = manager.add_disclaimers("Стоимость билета — 10 лари.", Language::Ru);
        assert!(answer.contains("### ⚠️ Важная информация:"));
        assert!(answer.contains("Цены могут изменяться"));
    }

    #[test]
    fn test_untouched_answer_when_no_keywords() {
        let manager = DisclaimerManager::new();
        let answer = "Svetitskhoveli is a beautiful cathedral.";
        assert_eq!(manager.add_disclaimers(answer, Language::En), answer);
    }
}
