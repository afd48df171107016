//! Sea-ORM Model 与领域结构之间的转换

use migration::entities::{
    booking, class, class_session, credit_ledger, csv_upload, pass, profile, purchase,
};

use crate::storage::models::{
    Booking, BookingDetail, ClassInfo, ClassSession, CsvUpload, LedgerEntry, Pass, Profile,
    Purchase,
};

pub fn model_to_profile(model: profile::Model) -> Profile {
    Profile {
        id: model.id,
        email: model.email,
        first_name: model.first_name,
        last_name: model.last_name,
        phone_number: model.phone_number,
        waiver_accepted: model.waiver_accepted,
        waiver_accepted_at: model.waiver_accepted_at,
        stripe_customer_id: model.stripe_customer_id,
        weekly_goal: model.weekly_goal,
        monthly_goal: model.monthly_goal,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn model_to_pass(model: pass::Model) -> Pass {
    Pass {
        id: model.id,
        name: model.name,
        description: model.description,
        credits: model.credits,
        unlimited: model.unlimited,
        validity_days: model.validity_days,
        stripe_price_id: model.stripe_price_id,
        is_active: model.is_active,
        price_cents: model.price_cents,
        currency: model.currency,
    }
}

pub fn model_to_purchase(model: purchase::Model) -> Purchase {
    Purchase {
        id: model.id,
        user_id: model.user_id,
        pass_id: model.pass_id,
        payment_reference: model.payment_reference,
        purchased_at: model.purchased_at,
    }
}

pub fn model_to_ledger_entry(model: credit_ledger::Model) -> LedgerEntry {
    LedgerEntry {
        id: model.id,
        user_id: model.user_id,
        pass_id: model.pass_id,
        delta: model.delta,
        reason: model.reason,
        ref_id: model.ref_id,
        created_at: model.created_at,
    }
}

pub fn model_to_class(model: class::Model) -> ClassInfo {
    ClassInfo {
        id: model.id,
        class_name: model.class_name,
        description: model.description,
        instructor: model.instructor,
        level: model.level,
        temperature_cel: model.temperature_cel,
        duration_minute: model.duration_minute,
        max_capacity: model.max_capacity,
        is_active: model.is_active,
    }
}

pub fn model_to_session(model: class_session::Model) -> ClassSession {
    ClassSession {
        id: model.id,
        class_id: model.class_id,
        day_of_week: model.day_of_week,
        start_time: model.start_time,
        end_time: model.end_time,
        is_active: model.is_active,
    }
}

pub fn model_to_booking(model: booking::Model) -> Booking {
    Booking {
        id: model.id,
        user_id: model.user_id,
        class_id: model.class_id,
        session_id: model.session_id,
        booking_date: model.booking_date,
        booked_at: model.booked_at,
        credits_charged: model.credits_charged,
        cancelled_at: model.cancelled_at,
        cancelled_by_user: model.cancelled_by_user,
        credit_refunded: model.credit_refunded,
    }
}

/// 组合预约、课程和时段
pub fn to_booking_detail(
    booking: booking::Model,
    class: &class::Model,
    session: &class_session::Model,
) -> BookingDetail {
    BookingDetail {
        booking: model_to_booking(booking),
        class_name: class.class_name.clone(),
        instructor: class.instructor.clone(),
        level: class.level.clone(),
        temperature_cel: class.temperature_cel,
        duration_minute: class.duration_minute,
        start_time: session.start_time,
        end_time: session.end_time,
    }
}

pub fn model_to_upload(model: csv_upload::Model) -> CsvUpload {
    CsvUpload {
        id: model.id,
        filename: model.filename,
        uploaded_by: model.uploaded_by,
        status: model.status,
        total_classes: model.total_classes,
        processed_classes: model.processed_classes,
        error_message: model.error_message,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
