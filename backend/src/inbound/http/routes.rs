//! REST route table.
//!
//! Every JSON endpoint lives under `/api`. Literal segments such as
//! `/materials/proxy/...` and `/projects/mine` are registered ahead of the
//! `{id}` patterns they would otherwise collide with.

use actix_web::web;

use crate::inbound::http::{
    analytics, contact, courses, internships, maintenance, materials, notices, notifications,
    payments, projects, subjects, subscriptions, users,
};

/// Register the `/api` scope on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(user_routes)
            .configure(catalogue_routes)
            .configure(commerce_routes)
            .configure(submission_routes)
            .configure(platform_routes),
    );
}

fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(users::register)
        .service(users::login)
        .service(users::refresh_token)
        .service(users::current_user)
        .service(users::update_profile)
        .service(users::upload_avatar)
        .service(users::add_device_token)
        .service(users::change_password)
        .service(users::forgot_password)
        .service(users::reset_password)
        .service(users::list_users)
        .service(users::set_user_status)
        .service(users::set_user_role)
        .service(users::delete_user);
}

fn catalogue_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(subjects::list_subjects)
        .service(subjects::get_subject)
        .service(subjects::create_subject)
        .service(subjects::update_subject)
        .service(subjects::disable_subject)
        .service(materials::proxy_file)
        .service(materials::list_by_subject)
        .service(materials::list_materials)
        .service(materials::download_material)
        .service(materials::get_material)
        .service(materials::create_material)
        .service(materials::update_material)
        .service(materials::delete_material)
        .service(notices::list_notices)
        .service(notices::get_notice)
        .service(notices::create_notice)
        .service(notices::update_notice)
        .service(notices::delete_notice)
        .service(notices::list_announcements)
        .service(notices::create_announcement)
        .service(notices::delete_announcement)
        .service(courses::list_courses)
        .service(courses::enroll_course)
        .service(courses::get_course)
        .service(courses::create_course)
        .service(courses::update_course)
        .service(courses::delete_course);
}

fn commerce_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(payments::payment_config)
        .service(payments::payment_webhook)
        .service(payments::verify_payment)
        .service(payments::create_payment_link)
        .service(payments::create_order)
        .service(payments::list_orders)
        .service(payments::refund_order)
        .service(payments::get_order)
        .service(subscriptions::my_subscription)
        .service(subscriptions::cancel_subscription)
        .service(subscriptions::list_subscriptions);
}

fn submission_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(projects::my_projects)
        .service(projects::submit_project)
        .service(projects::list_projects)
        .service(projects::review_project)
        .service(projects::delete_project)
        .service(internships::my_internships)
        .service(internships::apply_internship)
        .service(internships::list_internships)
        .service(internships::set_internship_status)
        .service(contact::submit_contact)
        .service(contact::list_contact)
        .service(contact::resolve_contact);
}

fn platform_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(notifications::unread_count)
        .service(notifications::mark_all_read)
        .service(notifications::list_notifications)
        .service(notifications::mark_read)
        .service(notifications::publish_notification)
        .service(analytics::overview)
        .service(analytics::audit_logs)
        .service(analytics::dashboard)
        .service(maintenance::maintenance_status)
        .service(maintenance::set_maintenance);
}
