//! Canonical text-chunk rendering
//!
//! One source row becomes exactly one Arabic text chunk. The wording is part
//! of the retrieval contract: answers quote these chunks back to the user,
//! so templates stay stable and missing values render a placeholder instead
//! of failing the record.

use sqlx::FromRow;

/// Placeholder for missing values
pub const NOT_SPECIFIED: &str = "غير محدد";

const NO_BOARDING_POINTS: &str = "لا توجد نقاط صعود إضافية";
const NO_ROUTE_STOPS: &str = "لا توجد نقاط توقف";
const FAQ_DEFAULT_CATEGORY: &str = "عام";
const NO_DESCRIPTION: &str = "لا يوجد وصف";

/// A scheduled trip with its boarding points aggregated in stop order
#[derive(Debug, Clone, FromRow)]
pub struct TripRow {
    pub trip_id: i64,
    pub origin_city: Option<String>,
    pub destination_city: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub base_price: Option<f64>,
    pub status: Option<String>,
    pub boarding_points: Option<String>,
}

/// A route with its stops aggregated in stop order
#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
    pub route_id: i64,
    pub origin_city: Option<String>,
    pub destination_city: Option<String>,
    pub estimated_duration_hours: Option<f64>,
    pub distance_km: Option<f64>,
    pub route_stops: Option<String>,
}

/// A cancellation policy joined with its owning company
#[derive(Debug, Clone, FromRow)]
pub struct PolicyRow {
    pub cancel_policy_id: i64,
    pub policy_name: Option<String>,
    pub description: Option<String>,
    pub refund_percentage: Option<f64>,
    pub hours_before_trip: Option<i32>,
    pub company_name: Option<String>,
}

/// An active FAQ entry
#[derive(Debug, Clone, FromRow)]
pub struct FaqRow {
    pub faq_id: i64,
    pub category: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
}

pub fn render_trip(row: &TripRow) -> String {
    let boarding = match row.boarding_points.as_deref() {
        Some(points) if !points.is_empty() => points,
        _ => NO_BOARDING_POINTS,
    };

    format!(
        "رحلة رقم {id}.\n\
         تنطلق من مدينة {origin} إلى مدينة {destination}.\n\
         وقت المغادرة: {departure}، ووقت الوصول المتوقع: {arrival}.\n\
         سعر التذكرة: {price} ريال.\n\
         حالة الرحلة: {status}.\n\
         نقاط الصعود المتاحة: {boarding}.",
        id = row.trip_id,
        origin = text_or_placeholder(&row.origin_city),
        destination = text_or_placeholder(&row.destination_city),
        departure = text_or_placeholder(&row.departure_time),
        arrival = text_or_placeholder(&row.arrival_time),
        price = number_or_placeholder(row.base_price),
        status = text_or_placeholder(&row.status),
        boarding = boarding,
    )
}

pub fn render_route(row: &RouteRow) -> String {
    let stops = match row.route_stops.as_deref() {
        Some(stops) if !stops.is_empty() => stops,
        _ => NO_ROUTE_STOPS,
    };

    format!(
        "مسار رقم {id}.\n\
         من {origin} إلى {destination}.\n\
         المدة المتوقعة: {duration} ساعة.\n\
         المسافة: {distance} كم.\n\
         نقاط التوقف على المسار: {stops}",
        id = row.route_id,
        origin = text_or_placeholder(&row.origin_city),
        destination = text_or_placeholder(&row.destination_city),
        duration = number_or_placeholder(row.estimated_duration_hours),
        distance = number_or_placeholder(row.distance_km),
        stops = stops,
    )
}

pub fn render_policy(row: &PolicyRow) -> String {
    format!(
        "سياسة الإلغاء: {name}.\n\
         الشركة: {company}.\n\
         {description}.\n\
         نسبة الاسترجاع: {refund}%.\n\
         يجب الإلغاء قبل {threshold} من موعد الرحلة.",
        name = text_or_placeholder(&row.policy_name),
        company = text_or_placeholder(&row.company_name),
        description = row.description.as_deref().unwrap_or(NO_DESCRIPTION),
        refund = number_or_placeholder(row.refund_percentage),
        threshold = match row.hours_before_trip {
            Some(hours) => cancellation_window(hours),
            None => NOT_SPECIFIED.to_string(),
        },
    )
}

pub fn render_faq(row: &FaqRow) -> String {
    format!(
        "سؤال شائع: {question}\n\
         التصنيف: {category}\n\
         الإجابة: {answer}",
        question = text_or_placeholder(&row.question),
        category = row.category.as_deref().unwrap_or(FAQ_DEFAULT_CATEGORY),
        answer = text_or_placeholder(&row.answer),
    )
}

/// Human rendering of the cancellation threshold: whole days at or above
/// 24 hours, raw hours below.
pub fn cancellation_window(hours: i32) -> String {
    if hours >= 24 {
        format!("{} يوم", hours / 24)
    } else {
        format!("{} ساعة", hours)
    }
}

fn text_or_placeholder(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(text) if !text.is_empty() => text,
        _ => NOT_SPECIFIED,
    }
}

fn number_or_placeholder(value: Option<f64>) -> String {
    match value {
        Some(number) if number.fract() == 0.0 => format!("{:.0}", number),
        Some(number) => format!("{}", number),
        None => NOT_SPECIFIED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trip() -> TripRow {
        TripRow {
            trip_id: 17,
            origin_city: Some("الرياض".to_string()),
            destination_city: Some("جدة".to_string()),
            departure_time: Some("2026-08-10 08:00:00+03".to_string()),
            arrival_time: Some("2026-08-10 18:30:00+03".to_string()),
            base_price: Some(150.0),
            status: Some("scheduled".to_string()),
            boarding_points: Some(
                "نقطة صعود: محطة النقل في موقع وسط المدينة - ترتيب: 1".to_string(),
            ),
        }
    }

    #[test]
    fn test_trip_chunk_contains_literals() {
        let chunk = render_trip(&sample_trip());
        assert!(chunk.contains("رحلة رقم 17"));
        assert!(chunk.contains("الرياض"));
        assert!(chunk.contains("جدة"));
        assert!(chunk.contains("150 ريال"));
        assert!(chunk.contains("حالة الرحلة: scheduled"));
        assert!(chunk.contains("نقطة صعود: محطة النقل"));
    }

    #[test]
    fn test_trip_missing_fields_render_placeholders() {
        let row = TripRow {
            trip_id: 3,
            origin_city: None,
            destination_city: None,
            departure_time: None,
            arrival_time: None,
            base_price: None,
            status: None,
            boarding_points: None,
        };
        let chunk = render_trip(&row);
        assert!(chunk.contains(NOT_SPECIFIED));
        assert!(chunk.contains("لا توجد نقاط صعود إضافية"));
    }

    #[test]
    fn test_route_chunk_with_and_without_stops() {
        let mut row = RouteRow {
            route_id: 5,
            origin_city: Some("الدمام".to_string()),
            destination_city: Some("الرياض".to_string()),
            estimated_duration_hours: Some(4.5),
            distance_km: Some(400.0),
            route_stops: Some("الأحساء (المحطة الرئيسية) - ترتيب: 1".to_string()),
        };
        let chunk = render_route(&row);
        assert!(chunk.contains("مسار رقم 5"));
        assert!(chunk.contains("المدة المتوقعة: 4.5 ساعة"));
        assert!(chunk.contains("المسافة: 400 كم"));
        assert!(chunk.contains("الأحساء"));

        row.route_stops = None;
        let chunk = render_route(&row);
        assert!(chunk.contains("لا توجد نقاط توقف"));
    }

    #[test]
    fn test_policy_threshold_days_and_hours() {
        assert_eq!(cancellation_window(48), "2 يوم");
        assert_eq!(cancellation_window(24), "1 يوم");
        assert_eq!(cancellation_window(12), "12 ساعة");
    }

    #[test]
    fn test_policy_chunk() {
        let row = PolicyRow {
            cancel_policy_id: 2,
            policy_name: Some("استرداد جزئي".to_string()),
            description: None,
            refund_percentage: Some(50.0),
            hours_before_trip: Some(48),
            company_name: Some("شركة السفر السريع".to_string()),
        };
        let chunk = render_policy(&row);
        assert!(chunk.contains("سياسة الإلغاء: استرداد جزئي"));
        assert!(chunk.contains("شركة السفر السريع"));
        assert!(chunk.contains("لا يوجد وصف"));
        assert!(chunk.contains("نسبة الاسترجاع: 50%"));
        assert!(chunk.contains("قبل 2 يوم"));
    }

    #[test]
    fn test_faq_chunk_defaults_category() {
        let row = FaqRow {
            faq_id: 9,
            category: None,
            question: Some("كيف أحجز؟".to_string()),
            answer: Some("من خلال التطبيق.".to_string()),
        };
        let chunk = render_faq(&row);
        assert!(chunk.contains("سؤال شائع: كيف أحجز؟"));
        assert!(chunk.contains("التصنيف: عام"));
        assert!(chunk.contains("الإجابة: من خلال التطبيق."));
    }
}
